//! Role grant table and the per-role contextual permission table.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Permission, Role};

/// What a role holds before any contextual check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleGrant {
    /// The whole catalogue, resolved when asked. New permissions extend it automatically.
    Everything,
    Only(&'static [Permission]),
}

impl RoleGrant {
    pub fn contains(self, permission: Permission) -> bool {
        match self {
            RoleGrant::Everything => true,
            RoleGrant::Only(list) => list.contains(&permission),
        }
    }

    pub fn permissions(self) -> &'static [Permission] {
        match self {
            RoleGrant::Everything => Permission::ALL,
            RoleGrant::Only(list) => list,
        }
    }
}

const SCHOOL_ADMIN: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ManageUsers,
    Permission::ViewUsers,
    Permission::ManageClasses,
    Permission::ViewClasses,
    Permission::ManageSubjects,
    Permission::ViewSubjects,
    Permission::ManageStudents,
    Permission::ViewStudents,
    Permission::ManageTeachers,
    Permission::ViewTeachers,
    Permission::ViewGrades,
    Permission::EditGrades,
    Permission::PublishResults,
    Permission::ViewAttendance,
    Permission::MarkAttendance,
    Permission::ViewAssignments,
    Permission::CreateAssignment,
    Permission::EditAssignment,
    Permission::DeleteAssignment,
    Permission::GradeSubmissions,
    Permission::ViewTimetable,
    Permission::ManageTimetable,
    Permission::ViewAnnouncements,
    Permission::ManageAnnouncements,
    Permission::ViewReports,
    Permission::ExportReports,
    Permission::ViewFees,
    Permission::ManageFees,
    Permission::ManageSettings,
];

const TEACHER: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewClasses,
    Permission::ViewSubjects,
    Permission::ViewStudents,
    Permission::ViewTeachers,
    Permission::ViewGrades,
    Permission::EditGrades,
    Permission::ViewAttendance,
    Permission::MarkAttendance,
    Permission::ViewAssignments,
    Permission::CreateAssignment,
    Permission::EditAssignment,
    Permission::DeleteAssignment,
    Permission::GradeSubmissions,
    Permission::ViewTimetable,
    Permission::ViewAnnouncements,
    Permission::ManageAnnouncements,
    Permission::ViewReports,
];

const STUDENT: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewGrades,
    Permission::ViewAttendance,
    Permission::ViewAssignments,
    Permission::SubmitAssignment,
    Permission::ViewTimetable,
    Permission::ViewAnnouncements,
    Permission::ViewFees,
];

const PARENT: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewGrades,
    Permission::ViewAttendance,
    Permission::ViewAssignments,
    Permission::ViewTimetable,
    Permission::ViewAnnouncements,
    Permission::ViewFees,
    Permission::ViewChildren,
];

/// Teacher grants that only hold for assigned classes/subjects.
const TEACHER_CONTEXTUAL: &[Permission] = &[
    Permission::EditGrades,
    Permission::MarkAttendance,
    Permission::CreateAssignment,
    Permission::EditAssignment,
    Permission::DeleteAssignment,
    Permission::GradeSubmissions,
];

/// `Role -> RoleGrant`. A role without a row holds nothing.
#[derive(Clone, Debug, Default)]
pub struct GrantTable {
    rows: BTreeMap<Role, RoleGrant>,
}

impl GrantTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The school deployment's table.
    pub fn standard() -> Self {
        Self::empty()
            .grant(Role::SuperAdmin, RoleGrant::Everything)
            .grant(Role::SchoolAdmin, RoleGrant::Only(SCHOOL_ADMIN))
            .grant(Role::Teacher, RoleGrant::Only(TEACHER))
            .grant(Role::Student, RoleGrant::Only(STUDENT))
            .grant(Role::Parent, RoleGrant::Only(PARENT))
    }

    pub fn grant(mut self, role: Role, grant: RoleGrant) -> Self {
        self.rows.insert(role, grant);
        self
    }

    pub fn holds(&self, role: Role, permission: Permission) -> bool {
        self.rows
            .get(&role)
            .is_some_and(|grant| grant.contains(permission))
    }

    pub fn grants(&self, role: Role) -> BTreeSet<Permission> {
        self.rows
            .get(&role)
            .map(|grant| grant.permissions().iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Which `(role, permission)` grants need a passing roster check.
#[derive(Clone, Debug, Default)]
pub struct ContextualRules {
    rows: BTreeMap<Role, &'static [Permission]>,
}

impl ContextualRules {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        Self::none().require(Role::Teacher, TEACHER_CONTEXTUAL)
    }

    pub fn require(mut self, role: Role, permissions: &'static [Permission]) -> Self {
        self.rows.insert(role, permissions);
        self
    }

    pub fn is_contextual(&self, role: Role, permission: Permission) -> bool {
        self.rows
            .get(&role)
            .is_some_and(|list| list.contains(&permission))
    }

    pub fn contextual_for(&self, role: Role) -> &'static [Permission] {
        self.rows.get(&role).copied().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_grant_tracks_the_catalogue() {
        let table = GrantTable::standard();
        let grants = table.grants(Role::SuperAdmin);
        assert_eq!(grants.len(), Permission::ALL.len());
        assert!(Permission::ALL.iter().all(|p| table.holds(Role::SuperAdmin, *p)));
    }

    #[test]
    fn missing_rows_grant_nothing() {
        let table = GrantTable::empty().grant(Role::Teacher, RoleGrant::Only(TEACHER));
        assert!(table.grants(Role::Parent).is_empty());
        assert!(!table.holds(Role::Parent, Permission::ViewDashboard));
    }

    #[test]
    fn school_admin_cannot_manage_schools() {
        let table = GrantTable::standard();
        assert!(!table.holds(Role::SchoolAdmin, Permission::ManageSchools));
        assert!(table.holds(Role::SchoolAdmin, Permission::PublishResults));
    }

    #[test]
    fn contextual_permissions_are_granted_to_their_role() {
        let table = GrantTable::standard();
        let rules = ContextualRules::standard();
        for role in Role::ALL {
            for permission in rules.contextual_for(*role) {
                assert!(
                    table.holds(*role, *permission),
                    "{role} has contextual {permission} without holding it"
                );
            }
        }
    }

    #[test]
    fn only_teacher_is_context_qualified_by_default() {
        let rules = ContextualRules::standard();
        assert!(rules.is_contextual(Role::Teacher, Permission::EditGrades));
        assert!(!rules.is_contextual(Role::SchoolAdmin, Permission::EditGrades));
        assert!(!rules.is_contextual(Role::Teacher, Permission::ViewGrades));
    }
}
