use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping all domain events, as produced by the
/// publishing services. This crate only decodes it.
///
/// Routing key format: `aula.{domain}.{entity}.{action}`
/// Example: `aula.course.assignment.posted`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Course events
    pub const COURSE_ASSIGNMENT_POSTED: &str = "aula.course.assignment.posted";
    pub const COURSE_ANNOUNCEMENT_PUBLISHED: &str = "aula.course.announcement.published";
    pub const COURSE_GRADE_RELEASED: &str = "aula.course.grade.released";

    // System events
    pub const SYSTEM_NOTICE_ISSUED: &str = "aula.system.notice.issued";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AssignmentPosted {
        pub assignment_id: Uuid,
        pub class_id: Uuid,
        pub class_name: String,
        pub title: String,
        pub due_at: Option<chrono::DateTime<chrono::Utc>>,
        pub recipient_ids: Vec<Uuid>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnnouncementPublished {
        pub announcement_id: Uuid,
        pub class_id: Uuid,
        pub class_name: String,
        pub title: String,
        pub preview: String,
        pub recipient_ids: Vec<Uuid>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct GradeReleased {
        pub assignment_id: Uuid,
        pub class_id: Uuid,
        pub student_id: Uuid,
        pub assignment_title: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SystemNotice {
        pub recipient_id: Uuid,
        pub subject: String,
        pub body: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_producer_envelope() {
        let student = Uuid::new_v4();
        let wire = serde_json::json!({
            "id": Uuid::now_v7(),
            "source": "aula-course",
            "event_type": routing_keys::COURSE_GRADE_RELEASED,
            "timestamp": Utc::now(),
            "correlation_id": null,
            "user_id": student,
            "data": {
                "assignment_id": Uuid::new_v4(),
                "class_id": Uuid::new_v4(),
                "student_id": student,
                "assignment_title": "Essay 1",
            },
        });

        let event: Event<payloads::GradeReleased> =
            serde_json::from_value(wire).unwrap();
        assert_eq!(event.source, "aula-course");
        assert_eq!(event.data.student_id, student);
        assert_eq!(event.data.assignment_title, "Essay 1");
    }
}
