//! Per-request context and the teacher assignment check.
//!
//! A contextual grant only holds when the roster carries an assignment for
//! the acting teacher on the requested class (and subject, when one is
//! given). Anything missing fails closed.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self(value.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl From<&str> for $name {
                fn from(value: &str) -> Self {
                    Self::new(value)
                }
            }

            impl From<String> for $name {
                fn from(value: String) -> Self {
                    Self(value)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

string_id!(ActorId, ClassId, SubjectId, StudentId);

/// One teacher × class (× subject) assignment.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssignmentRecord {
    pub actor_id: ActorId,
    pub class_id: ClassId,
    /// `None` for a class-wide assignment.
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
}

impl AssignmentRecord {
    pub fn new(
        actor_id: impl Into<ActorId>,
        class_id: impl Into<ClassId>,
        subject_id: Option<SubjectId>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            class_id: class_id.into(),
            subject_id,
        }
    }

    fn matches(&self, actor: &ActorId, class: &ClassId, subject: Option<&SubjectId>) -> bool {
        if &self.actor_id != actor || &self.class_id != class {
            return false;
        }
        match subject {
            None => true,
            Some(wanted) => self.subject_id.as_ref() == Some(wanted),
        }
    }
}

/// Resource the caller wants to act on, plus the roster to check it against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermissionContext {
    pub class_id: Option<ClassId>,
    pub subject_id: Option<SubjectId>,
    pub student_id: Option<StudentId>,
    pub actor_id: Option<ActorId>,
    pub roster: Option<Vec<AssignmentRecord>>,
}

impl PermissionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor_id = Some(actor.into());
        self
    }

    pub fn class(mut self, class: impl Into<ClassId>) -> Self {
        self.class_id = Some(class.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<SubjectId>) -> Self {
        self.subject_id = Some(subject.into());
        self
    }

    pub fn student(mut self, student: impl Into<StudentId>) -> Self {
        self.student_id = Some(student.into());
        self
    }

    pub fn roster(mut self, roster: Vec<AssignmentRecord>) -> Self {
        self.roster = Some(roster);
        self
    }

    /// Whether the context passes the assignment check.
    pub fn qualifies(&self) -> bool {
        qualifies(
            self.actor_id.as_ref(),
            self.class_id.as_ref(),
            self.subject_id.as_ref(),
            self.roster.as_deref(),
        )
    }
}

/// True iff some record matches `actor` and `class`, and `subject` when given.
///
/// A missing actor, class or roster is a `false`, never a default grant.
/// A subject without a class is likewise `false`.
pub fn qualifies(
    actor: Option<&ActorId>,
    class: Option<&ClassId>,
    subject: Option<&SubjectId>,
    roster: Option<&[AssignmentRecord]>,
) -> bool {
    let (Some(actor), Some(class), Some(roster)) = (actor, class, roster) else {
        return false;
    };
    roster
        .iter()
        .any(|record| record.matches(actor, class, subject))
}
