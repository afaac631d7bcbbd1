use std::time::Duration;

use crate::{
    cache::Pipeline,
    student::{Student, StudentId},
};

pub const STUDENT_KEY_PREFIX: &str = "student:";
pub const STUDENT_LIST_KEY: &str = "students_list";
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Key of the per-student hash
pub fn student_key(id: StudentId) -> String {
    format!("{STUDENT_KEY_PREFIX}{id}")
}

/// Decides which cache commands follow each service operation
#[derive(Clone, Copy, Debug)]
pub struct CachePolicy {
    pub ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl CachePolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Replace the whole hash of `student` and reset its TTL.
    /// The leading delete keeps fields of an older entry from surviving.
    pub fn refresh(&self, student: &Student) -> Pipeline {
        let key = student_key(student.id);
        Pipeline::new()
            .del(&key)
            .hset(&key, student.to_fields())
            .expire(&key, self.ttl)
    }

    /// Refresh after a create or update: entity entry rewritten, list dropped
    pub fn refresh_and_invalidate_list(&self, student: &Student) -> Pipeline {
        self.refresh(student).del(STUDENT_LIST_KEY)
    }

    /// Both the entity entry and the list snapshot go away
    pub fn evict(&self, id: StudentId) -> Pipeline {
        Pipeline::new().del(&student_key(id)).del(STUDENT_LIST_KEY)
    }

    pub fn store_list(&self, snapshot: String) -> Pipeline {
        Pipeline::new().set_ex(STUDENT_LIST_KEY, snapshot, self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheCommand;

    #[test]
    fn key_scheme() {
        assert_eq!(student_key(42), "student:42");
    }

    #[test]
    fn refresh_overwrites_then_expires() {
        let policy = CachePolicy::new(Duration::from_secs(5));
        let student = Student {
            id: 7,
            name: "Bo".to_string(),
            email: "bo@x.com".to_string(),
            age: 30,
        };
        let commands = policy.refresh_and_invalidate_list(&student).into_commands();

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0], CacheCommand::Del("student:7".to_string()));
        assert!(matches!(&commands[1], CacheCommand::HSet(k, f) if k == "student:7" && f.len() == 4));
        assert_eq!(
            commands[2],
            CacheCommand::Expire("student:7".to_string(), Duration::from_secs(5))
        );
        assert_eq!(commands[3], CacheCommand::Del(STUDENT_LIST_KEY.to_string()));
    }

    #[test]
    fn evict_drops_both_keys() {
        let commands = CachePolicy::default().evict(3).into_commands();
        assert_eq!(
            commands,
            vec![
                CacheCommand::Del("student:3".to_string()),
                CacheCommand::Del(STUDENT_LIST_KEY.to_string()),
            ]
        );
    }
}
