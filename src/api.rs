use actix_web::{web, HttpResponse, Responder, Result};
use serde::Serialize;
use validator::Validate;

use crate::{
    cache::CacheBackend,
    error::ApiError,
    service::StudentService,
    store::StudentStore,
    student::{StudentId, StudentInput},
};

pub struct ServerState<S, C> {
    service: StudentService<S, C>,
}

impl<S, C> ServerState<S, C>
where
    S: StudentStore,
    C: CacheBackend + 'static,
{
    pub fn new(service: StudentService<S, C>) -> Self {
        Self { service }
    }
}

#[derive(Serialize)]
struct MessageBody {
    message: &'static str,
}

/// Ids come from the store and start at 1
fn parse_id(raw: &str) -> Result<StudentId, ApiError> {
    match raw.parse::<StudentId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::InvalidId(raw.to_string())),
    }
}

/// Mount every student route under `/api/students`
pub fn configure<S, C>(cfg: &mut web::ServiceConfig)
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    cfg.service(
        web::scope("/api/students")
            .route("", web::post().to(create_student::<S, C>))
            .route("", web::get().to(list_students::<S, C>))
            .route("/{id}", web::get().to(get_student::<S, C>))
            .route("/{id}", web::put().to(update_student::<S, C>))
            .route("/{id}", web::delete().to(delete_student::<S, C>)),
    );
}

// POST /api/students
pub async fn create_student<S, C>(
    data: web::Data<ServerState<S, C>>,
    json_req: web::Json<StudentInput>,
) -> Result<impl Responder, ApiError>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let input = json_req.into_inner();
    input.validate()?;
    let student = data.service.create(input).await?;
    Ok(HttpResponse::Created().json(student))
}

// GET /api/students
pub async fn list_students<S, C>(
    data: web::Data<ServerState<S, C>>,
) -> Result<impl Responder, ApiError>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let students = data.service.get_all().await?;
    Ok(web::Json(students))
}

// GET /api/students/{id}
pub async fn get_student<S, C>(
    data: web::Data<ServerState<S, C>>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let id = parse_id(&path)?;
    let student = data.service.get_by_id(id).await?;
    Ok(web::Json(student))
}

// PUT /api/students/{id}
pub async fn update_student<S, C>(
    data: web::Data<ServerState<S, C>>,
    path: web::Path<String>,
    json_req: web::Json<StudentInput>,
) -> Result<impl Responder, ApiError>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let id = parse_id(&path)?;
    let input = json_req.into_inner();
    input.validate()?;
    let student = data.service.update(id, input).await?;
    Ok(web::Json(student))
}

// DELETE /api/students/{id}
pub async fn delete_student<S, C>(
    data: web::Data<ServerState<S, C>>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError>
where
    S: StudentStore + 'static,
    C: CacheBackend + 'static,
{
    let id = parse_id(&path)?;
    data.service.delete(id).await?;
    Ok(web::Json(MessageBody {
        message: "Student deleted successfully",
    }))
}
