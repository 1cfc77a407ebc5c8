//! Request DTOs, query parameters, and JSON mapping helpers.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use portal_audit::{AuditFilter, AuditResult, EntityKind};
use portal_auth::Identity;
use portal_core::UserId;
use portal_infra::TaskStatus;

pub const MAX_PROJECT_NAME: usize = 255;
pub const MAX_DESCRIPTION: usize = 1000;

// ─── Requests ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(&str, &str), Vec<&'static str>> {
        let mut details = Vec::new();
        let email = self.email.as_deref().map(str::trim).unwrap_or("");
        let password = self.password.as_deref().unwrap_or("");

        if email.is_empty() {
            details.push("Email is required");
        } else if !email.contains('@') {
            details.push("Email is invalid");
        }
        if password.is_empty() {
            details.push("Password is required");
        } else if password.len() < 6 {
            details.push("Password must be at least 6 characters");
        }

        if details.is_empty() {
            Ok((email, password))
        } else {
            Err(details)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ProjectRequest {
    pub fn validate(&self) -> Result<(String, Option<String>), Vec<&'static str>> {
        let mut details = Vec::new();
        let name = self.name.as_deref().map(str::trim).unwrap_or("");

        if name.is_empty() {
            details.push("Project name is required");
        } else if name.len() > MAX_PROJECT_NAME {
            details.push("Project name must be at most 255 characters");
        }
        if let Some(desc) = &self.description {
            if desc.len() > MAX_DESCRIPTION {
                details.push("Description must be at most 1000 characters");
            }
        }

        if details.is_empty() {
            Ok((name.to_string(), self.description.clone()))
        } else {
            Err(details)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl TaskRequest {
    pub fn validate(&self) -> Result<(String, Option<String>, TaskStatus), Vec<&'static str>> {
        let mut details = Vec::new();
        let title = self.title.as_deref().map(str::trim).unwrap_or("");

        if title.is_empty() {
            details.push("Task title is required");
        }
        if let Some(desc) = &self.description {
            if desc.len() > MAX_DESCRIPTION {
                details.push("Description must be at most 1000 characters");
            }
        }
        let status = match &self.status {
            None => TaskStatus::default(),
            Some(raw) => match raw.parse() {
                Ok(status) => status,
                Err(_) => {
                    details.push("Status must be one of: new, in_progress, done");
                    TaskStatus::default()
                }
            },
        };

        if details.is_empty() {
            Ok((title.to_string(), self.description.clone(), status))
        } else {
            Err(details)
        }
    }
}

// ─── Query parameters ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub action: Option<String>,
    pub user_id: Option<i64>,
    pub entity_type: Option<String>,
    pub result: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl LogsQuery {
    pub fn filter(&self) -> Result<AuditFilter, Vec<&'static str>> {
        let mut details = Vec::new();

        let entity_type = match self.entity_type.as_deref() {
            None => None,
            Some("user") => Some(EntityKind::User),
            Some("project") => Some(EntityKind::Project),
            Some("task") => Some(EntityKind::Task),
            Some("admin_view") => Some(EntityKind::AdminView),
            Some(_) => {
                details.push("Entity type must be one of: user, project, task, admin_view");
                None
            }
        };
        let result = match self.result.as_deref() {
            None => None,
            Some("success") => Some(AuditResult::Success),
            Some("fail") => Some(AuditResult::Fail),
            Some(_) => {
                details.push("Result must be success or fail");
                None
            }
        };
        let from = match &self.from {
            None => None,
            Some(raw) => match parse_date(raw) {
                Some(dt) => Some(dt),
                None => {
                    details.push("From date must be RFC 3339");
                    None
                }
            },
        };
        let to = match &self.to {
            None => None,
            Some(raw) => match parse_date(raw) {
                Some(dt) => Some(dt),
                None => {
                    details.push("To date must be RFC 3339");
                    None
                }
            },
        };

        if details.is_empty() {
            Ok(AuditFilter {
                action_contains: self.action.clone(),
                actor: self.user_id.map(UserId::new),
                entity_type,
                result,
                from,
                to,
            })
        } else {
            Err(details)
        }
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ─── Response mapping ───────────────────────────────────────────────────────

pub fn user_to_json(identity: &Identity) -> serde_json::Value {
    serde_json::json!({
        "id": identity.id,
        "email": identity.email,
        "role": identity.role,
        "status": identity.status,
        "created_at": identity.created_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_validation_lists_every_missing_field() {
        let req = LoginRequest {
            email: None,
            password: Some("".into()),
        };
        let details = req.validate().unwrap_err();
        assert_eq!(details, vec!["Email is required", "Password is required"]);
    }

    #[test]
    fn login_validation_checks_shape_and_length() {
        let req = LoginRequest {
            email: Some("not-an-email".into()),
            password: Some("short".into()),
        };
        let details = req.validate().unwrap_err();
        assert_eq!(
            details,
            vec!["Email is invalid", "Password must be at least 6 characters"]
        );
    }

    #[test]
    fn project_name_bounds_are_enforced() {
        let req = ProjectRequest {
            name: Some("x".repeat(256)),
            description: None,
        };
        assert!(req.validate().is_err());

        let req = ProjectRequest {
            name: Some("  Edge Deploy  ".into()),
            description: Some("d".repeat(1000)),
        };
        let (name, _) = req.validate().unwrap();
        assert_eq!(name, "Edge Deploy");
    }

    #[test]
    fn task_status_falls_back_to_new_and_rejects_garbage() {
        let req = TaskRequest {
            title: Some("t".into()),
            description: None,
            status: None,
        };
        assert_eq!(req.validate().unwrap().2, TaskStatus::New);

        let req = TaskRequest {
            title: Some("t".into()),
            description: None,
            status: Some("paused".into()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn logs_query_parses_filters() {
        let query = LogsQuery {
            action: Some("login".into()),
            user_id: Some(7),
            entity_type: Some("project".into()),
            result: Some("fail".into()),
            from: Some("2026-01-01T00:00:00Z".into()),
            to: None,
            page: None,
            limit: None,
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.action_contains.as_deref(), Some("login"));
        assert_eq!(filter.actor, Some(UserId::new(7)));
        assert_eq!(filter.entity_type, Some(EntityKind::Project));
        assert_eq!(filter.result, Some(AuditResult::Fail));
        assert!(filter.from.is_some());

        let query = LogsQuery {
            result: Some("maybe".into()),
            ..Default::default()
        };
        assert!(query.filter().is_err());
    }
}
