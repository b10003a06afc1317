//! Closed role and permission catalogues.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::AuthzError;

// Every permission is declared exactly once here. The macro derives the enum,
// the `ALL` slice and the wire names from the same list so they cannot drift.
macro_rules! catalogue {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal, )+) => {
        /// A named capability. Wire names have the shape `resource:action`.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Permission {
            $( $(#[$meta])* $variant, )+
        }

        impl Permission {
            /// Every permission in declaration order.
            pub const ALL: &'static [Permission] = &[ $( Permission::$variant, )+ ];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Permission::$variant => $name, )+
                }
            }
        }

        impl FromStr for Permission {
            type Err = AuthzError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $name => Ok(Permission::$variant), )+
                    other => Err(AuthzError::UnknownPermission(other.to_string())),
                }
            }
        }
    };
}

catalogue! {
    ViewDashboard => "dashboard:view",
    ManageSchools => "schools:manage",
    ManageUsers => "users:manage",
    ViewUsers => "users:view",
    ManageClasses => "classes:manage",
    ViewClasses => "classes:view",
    ManageSubjects => "subjects:manage",
    ViewSubjects => "subjects:view",
    ManageStudents => "students:manage",
    ViewStudents => "students:view",
    ManageTeachers => "teachers:manage",
    ViewTeachers => "teachers:view",
    ViewGrades => "grades:view",
    /// Enter or change marks for a class/subject.
    EditGrades => "grades:edit",
    /// Release term results to students and parents.
    PublishResults => "results:publish",
    ViewAttendance => "attendance:view",
    MarkAttendance => "attendance:mark",
    ViewAssignments => "assignments:view",
    CreateAssignment => "assignments:create",
    EditAssignment => "assignments:edit",
    DeleteAssignment => "assignments:delete",
    SubmitAssignment => "submissions:create",
    GradeSubmissions => "submissions:grade",
    ViewTimetable => "timetable:view",
    ManageTimetable => "timetable:manage",
    ViewAnnouncements => "announcements:view",
    ManageAnnouncements => "announcements:manage",
    ViewReports => "reports:view",
    ExportReports => "reports:export",
    ViewFees => "fees:view",
    ManageFees => "fees:manage",
    /// Parents reading the records of their linked students.
    ViewChildren => "children:view",
    ManageSettings => "settings:manage",
}

impl Permission {
    /// Parse a list of wire names, failing on the first unknown one.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Permission>, AuthzError> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Actor kinds. Supplied by the caller from an authenticated session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::SuperAdmin,
        Role::SchoolAdmin,
        Role::Teacher,
        Role::Student,
        Role::Parent,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::SchoolAdmin => "school_admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownRole(value.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
