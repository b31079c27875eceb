/// Authorization and tenant isolation
///
/// Every request that touches tenant data follows the same path:
///
/// 1. [`authenticate`] turns the `Authorization` header into a user ID
/// 2. [`resolve_principal`] loads that user's company
/// 3. one `authorize_*` function decides ALLOW/DENY and, on ALLOW, returns a
///    scope or grant value
/// 4. the [`Store`] applies exactly that scope or grant
///
/// Scope and grant types only have crate-private constructors, so step 4
/// cannot be reached without step 3.
///
/// # Rules
///
/// - Projects are visible to their owner and members
/// - Users are visible within their company
/// - Tasks are visible when their project is
/// - Members and assignees must come from the principal's company, and so
///   must the project they join
///
/// # Example
///
/// ```
/// use teamtrack_shared::auth::access::{authorize_user_list, resolve_principal};
/// use teamtrack_shared::store::Store;
/// use uuid::Uuid;
///
/// # async fn example(store: &dyn Store, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let principal = resolve_principal(store, user_id).await?;
/// let scope = authorize_user_list(&principal);
/// let colleagues = store.list_users(&scope).await?;
/// assert!(colleagues.iter().all(|u| u.company_id == principal.company_id()));
/// # Ok(())
/// # }
/// ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::project::Project;
use crate::models::task::{Task, TaskPriority, TaskStatus};
use crate::models::user::User;
use crate::store::{Store, StoreError};

/// Error type for access decisions
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// No `Authorization` header
    #[error("Authentication required")]
    Unauthenticated,

    /// Header present but not a valid bearer token
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token was valid but its user no longer exists
    #[error("User not found")]
    PrincipalNotFound,

    /// Operation would cross a company boundary
    #[error("{0}")]
    CrossTenantViolation(String),

    /// Refused by the member-add policy
    #[error("{0}")]
    Forbidden(String),

    /// Entity is missing or outside the caller's scope
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Store failure while resolving the principal
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Authenticated user together with their company
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    user_id: Uuid,
    company_id: Uuid,
}

impl Principal {
    pub(crate) fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            company_id: user.company_id,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn company_id(&self) -> Uuid {
        self.company_id
    }
}

/// Projects owned by or shared with one user
#[derive(Debug, Clone)]
pub struct ProjectScope {
    pub(crate) user_id: Uuid,
}

/// Users of one company
#[derive(Debug, Clone)]
pub struct UserScope {
    pub(crate) company_id: Uuid,
}

/// Tasks whose project is visible to one user, optionally one project only
#[derive(Debug, Clone)]
pub struct TaskScope {
    pub(crate) user_id: Uuid,
    pub(crate) project_id: Option<Uuid>,
}

/// Client-supplied project fields
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
}

/// Project ready for insertion; owner and company come from the principal
#[derive(Debug, Clone)]
pub struct NewProject {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) owner_id: Uuid,
    pub(crate) company_id: Uuid,
}

/// Permission to add one user to one project
#[derive(Debug, Clone)]
pub struct MemberGrant {
    pub(crate) project_id: Uuid,
    pub(crate) user_id: Uuid,
}

/// Permission to assign tasks of one project to one user
#[derive(Debug, Clone)]
pub struct AssignGrant {
    pub(crate) project_id: Uuid,
    pub(crate) assignee_id: Uuid,
}

/// Client-supplied task fields
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<DateTime<Utc>>,
}

/// Task ready for insertion into an authorized project
#[derive(Debug, Clone)]
pub struct NewTask {
    pub(crate) project_id: Uuid,
    pub(crate) assignee: Option<AssignGrant>,
    pub(crate) draft: TaskDraft,
}

/// Partial task fields; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<Option<DateTime<Utc>>>,
}

/// What a task update does to the assignee
#[derive(Debug, Clone, Default)]
pub enum AssignmentChange {
    #[default]
    Keep,
    Clear,
    Assign(AssignGrant),
}

/// A task update: field changes plus an assignee change
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub(crate) changes: TaskChanges,
    pub(crate) assignment: AssignmentChange,
}

impl TaskUpdate {
    pub fn new(changes: TaskChanges, assignment: AssignmentChange) -> Self {
        Self {
            changes,
            assignment,
        }
    }

    /// Project an assignment grant was issued for
    pub(crate) fn assigned_project(&self) -> Option<Uuid> {
        match &self.assignment {
            AssignmentChange::Assign(grant) => Some(grant.project_id),
            _ => None,
        }
    }

    /// New `assigned_to_id` value, if it changes
    pub(crate) fn assigned_to(&self) -> Option<Option<Uuid>> {
        match &self.assignment {
            AssignmentChange::Keep => None,
            AssignmentChange::Clear => Some(None),
            AssignmentChange::Assign(grant) => Some(Some(grant.assignee_id)),
        }
    }
}

/// Who, besides company colleagues, may add project members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberAddPolicy {
    /// Any user of the project's company
    #[default]
    SameCompany,
    /// The owner or an existing member
    ProjectMember,
    /// The owner only
    OwnerOnly,
}

impl MemberAddPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAddPolicy::SameCompany => "same-company",
            MemberAddPolicy::ProjectMember => "project-member",
            MemberAddPolicy::OwnerOnly => "owner-only",
        }
    }

    fn permits(&self, principal: &Principal, project: &Project) -> bool {
        match self {
            MemberAddPolicy::SameCompany => true,
            MemberAddPolicy::ProjectMember => project.is_visible_to(principal.user_id),
            MemberAddPolicy::OwnerOnly => project.owner_id == principal.user_id,
        }
    }
}

impl fmt::Display for MemberAddPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberAddPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "same-company" => Ok(MemberAddPolicy::SameCompany),
            "project-member" => Ok(MemberAddPolicy::ProjectMember),
            "owner-only" => Ok(MemberAddPolicy::OwnerOnly),
            other => Err(format!("Unknown member-add policy: {}", other)),
        }
    }
}

/// Extracts and verifies the bearer token from an `Authorization` header
///
/// # Errors
///
/// - `AccessError::Unauthenticated` if the header is absent
/// - `AccessError::InvalidToken` if it isn't `Bearer <token>` or the token
///   fails verification
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<Uuid, AccessError> {
    let header = header.ok_or(AccessError::Unauthenticated)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AccessError::InvalidToken("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AccessError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AccessError::InvalidToken("Invalid issuer".to_string()),
        other => AccessError::InvalidToken(other.to_string()),
    })?;

    Ok(claims.user_id)
}

/// Loads the principal's user record
///
/// # Errors
///
/// `AccessError::PrincipalNotFound` if the user has been removed since the
/// token was issued.
pub async fn resolve_principal(store: &dyn Store, user_id: Uuid) -> Result<Principal, AccessError> {
    let user = store
        .find_user(user_id)
        .await?
        .ok_or(AccessError::PrincipalNotFound)?;

    Ok(Principal::from_user(&user))
}

pub fn authorize_project_read(principal: &Principal) -> ProjectScope {
    ProjectScope {
        user_id: principal.user_id,
    }
}

/// Builds a project owned by the principal in the principal's company
pub fn authorize_project_create(principal: &Principal, draft: ProjectDraft) -> NewProject {
    NewProject {
        name: draft.name,
        description: draft.description,
        owner_id: principal.user_id,
        company_id: principal.company_id,
    }
}

/// Decides whether `principal` may add `candidate` to `project`
///
/// The candidate and the project must both belong to the principal's
/// company; `policy` may restrict further.
///
/// # Errors
///
/// - `AccessError::CrossTenantViolation` on a company mismatch
/// - `AccessError::Forbidden` when the policy refuses
pub fn authorize_member_add(
    policy: MemberAddPolicy,
    principal: &Principal,
    project: &Project,
    candidate: &User,
) -> Result<MemberGrant, AccessError> {
    if candidate.company_id != principal.company_id || project.company_id != principal.company_id {
        tracing::warn!(
            principal_id = %principal.user_id,
            project_id = %project.id,
            candidate_id = %candidate.id,
            "Cross-company member add denied"
        );
        return Err(AccessError::CrossTenantViolation(
            "Cannot add users from different companies".to_string(),
        ));
    }

    if !policy.permits(principal, project) {
        tracing::warn!(
            principal_id = %principal.user_id,
            project_id = %project.id,
            policy = %policy,
            "Member add refused by policy"
        );
        return Err(AccessError::Forbidden(format!(
            "Adding members requires the {} policy to be satisfied",
            policy
        )));
    }

    Ok(MemberGrant {
        project_id: project.id,
        user_id: candidate.id,
    })
}

/// Decides whether tasks of `project` may be assigned to `assignee`
///
/// When `task` is given it must belong to `project`.
///
/// # Errors
///
/// - `AccessError::CrossTenantViolation` if the assignee or the project is
///   from another company
/// - `AccessError::NotFound` if `task` is not in `project`
pub fn authorize_task_assign(
    principal: &Principal,
    task: Option<&Task>,
    assignee: &User,
    project: &Project,
) -> Result<AssignGrant, AccessError> {
    if let Some(task) = task {
        if task.project_id != project.id {
            return Err(AccessError::NotFound("Task"));
        }
    }

    if assignee.company_id != principal.company_id || project.company_id != principal.company_id {
        tracing::warn!(
            principal_id = %principal.user_id,
            project_id = %project.id,
            assignee_id = %assignee.id,
            "Cross-company task assignment denied"
        );
        return Err(AccessError::CrossTenantViolation(
            "Cannot assign tasks to users from different companies".to_string(),
        ));
    }

    Ok(AssignGrant {
        project_id: project.id,
        assignee_id: assignee.id,
    })
}

/// Decides whether `principal` may create a task in `project`
///
/// # Errors
///
/// `AccessError::CrossTenantViolation` if the project or the assignee is from
/// another company.
pub fn authorize_task_create(
    principal: &Principal,
    project: &Project,
    assignee: Option<&User>,
    draft: TaskDraft,
) -> Result<NewTask, AccessError> {
    if project.company_id != principal.company_id {
        tracing::warn!(
            principal_id = %principal.user_id,
            project_id = %project.id,
            "Cross-company task creation denied"
        );
        return Err(AccessError::CrossTenantViolation(
            "Cannot create tasks in projects of other companies".to_string(),
        ));
    }

    let assignee = assignee
        .map(|user| authorize_task_assign(principal, None, user, project))
        .transpose()?;

    Ok(NewTask {
        project_id: project.id,
        assignee,
        draft,
    })
}

pub fn authorize_task_read(principal: &Principal, project_id: Option<Uuid>) -> TaskScope {
    TaskScope {
        user_id: principal.user_id,
        project_id,
    }
}

pub fn authorize_user_list(principal: &Principal) -> UserScope {
    UserScope {
        company_id: principal.company_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use crate::models::project::ProjectStatus;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn user(company_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Someone".to_string(),
            email: format!("{}@example.test", Uuid::new_v4()),
            password_hash: String::new(),
            company_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn project_of(owner: &User) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Apollo".to_string(),
            description: None,
            owner_id: owner.id,
            company_id: owner.company_id,
            members: vec![owner.id],
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        }
    }

    struct World {
        alice: User,
        bob: User,
        carol: User,
    }

    /// Alice and Bob at Acme, Carol at Globex
    fn world() -> World {
        let acme = Uuid::new_v4();
        let globex = Uuid::new_v4();
        World {
            alice: user(acme),
            bob: user(acme),
            carol: user(globex),
        }
    }

    #[test]
    fn test_authenticate_missing_header() {
        assert!(matches!(
            authenticate(None, SECRET),
            Err(AccessError::Unauthenticated)
        ));
    }

    #[test]
    fn test_authenticate_rejects_non_bearer() {
        assert!(matches!(
            authenticate(Some("Basic abc"), SECRET),
            Err(AccessError::InvalidToken(_))
        ));
        assert!(matches!(
            authenticate(Some("Bearer "), SECRET),
            Err(AccessError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_authenticate_valid_and_expired_tokens() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(authenticate(Some(&header), SECRET).unwrap(), user_id);

        let expired = Claims::with_expiration(user_id, Duration::seconds(-60)).unwrap();
        let header = format!("Bearer {}", create_token(&expired, SECRET).unwrap());
        assert!(matches!(
            authenticate(Some(&header), SECRET),
            Err(AccessError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_project_create_takes_owner_and_company_from_principal() {
        let w = world();
        let principal = Principal::from_user(&w.alice);

        let project = authorize_project_create(
            &principal,
            ProjectDraft {
                name: "Apollo".to_string(),
                description: None,
            },
        );

        assert_eq!(project.owner_id, w.alice.id);
        assert_eq!(project.company_id, w.alice.company_id);
    }

    #[test]
    fn test_member_add_same_company_allowed() {
        let w = world();
        let project = project_of(&w.alice);
        let principal = Principal::from_user(&w.alice);

        let grant =
            authorize_member_add(MemberAddPolicy::SameCompany, &principal, &project, &w.bob)
                .unwrap();
        assert_eq!(grant.project_id, project.id);
        assert_eq!(grant.user_id, w.bob.id);
    }

    #[test]
    fn test_member_add_cross_company_denied_both_directions() {
        let w = world();

        // Acme principal adding a Globex user to an Acme project
        let acme_project = project_of(&w.alice);
        let result = authorize_member_add(
            MemberAddPolicy::SameCompany,
            &Principal::from_user(&w.alice),
            &acme_project,
            &w.carol,
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));

        // Globex principal adding an Acme user to a Globex project
        let globex_project = project_of(&w.carol);
        let result = authorize_member_add(
            MemberAddPolicy::SameCompany,
            &Principal::from_user(&w.carol),
            &globex_project,
            &w.bob,
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));
    }

    #[test]
    fn test_member_add_into_foreign_project_denied() {
        let w = world();
        let globex_project = project_of(&w.carol);

        let result = authorize_member_add(
            MemberAddPolicy::SameCompany,
            &Principal::from_user(&w.alice),
            &globex_project,
            &w.bob,
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));
    }

    #[test]
    fn test_member_add_policies() {
        let w = world();
        let project = project_of(&w.alice);
        let bob = Principal::from_user(&w.bob);
        let alice = Principal::from_user(&w.alice);

        assert!(authorize_member_add(MemberAddPolicy::SameCompany, &bob, &project, &w.bob).is_ok());
        assert!(matches!(
            authorize_member_add(MemberAddPolicy::ProjectMember, &bob, &project, &w.bob),
            Err(AccessError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_member_add(MemberAddPolicy::OwnerOnly, &bob, &project, &w.bob),
            Err(AccessError::Forbidden(_))
        ));
        assert!(authorize_member_add(MemberAddPolicy::OwnerOnly, &alice, &project, &w.bob).is_ok());

        let mut shared = project.clone();
        shared.members.push(w.bob.id);
        assert!(
            authorize_member_add(MemberAddPolicy::ProjectMember, &bob, &shared, &w.bob).is_ok()
        );
    }

    #[test]
    fn test_member_add_policy_parse() {
        assert_eq!(
            "same-company".parse::<MemberAddPolicy>().unwrap(),
            MemberAddPolicy::SameCompany
        );
        assert_eq!(
            " Owner-Only ".parse::<MemberAddPolicy>().unwrap(),
            MemberAddPolicy::OwnerOnly
        );
        assert!("anyone".parse::<MemberAddPolicy>().is_err());
        assert_eq!(MemberAddPolicy::default().to_string(), "same-company");
    }

    #[test]
    fn test_task_assign_cross_company_denied_both_directions() {
        let w = world();

        let acme_project = project_of(&w.alice);
        let result = authorize_task_assign(
            &Principal::from_user(&w.alice),
            None,
            &w.carol,
            &acme_project,
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));

        let globex_project = project_of(&w.carol);
        let result = authorize_task_assign(
            &Principal::from_user(&w.carol),
            None,
            &w.alice,
            &globex_project,
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));
    }

    #[test]
    fn test_task_assign_rejects_task_from_other_project() {
        let w = world();
        let project = project_of(&w.alice);
        let task = Task {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            description: None,
            project_id: Uuid::new_v4(),
            assigned_to_id: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let result =
            authorize_task_assign(&Principal::from_user(&w.alice), Some(&task), &w.bob, &project);
        assert!(matches!(result, Err(AccessError::NotFound("Task"))));
    }

    #[test]
    fn test_task_create_checks_project_company_without_assignee() {
        let w = world();
        let globex_project = project_of(&w.carol);

        let result = authorize_task_create(
            &Principal::from_user(&w.alice),
            &globex_project,
            None,
            TaskDraft::default(),
        );
        assert!(matches!(result, Err(AccessError::CrossTenantViolation(_))));
    }

    #[test]
    fn test_task_create_with_assignee() {
        let w = world();
        let project = project_of(&w.alice);
        let principal = Principal::from_user(&w.alice);

        let task = authorize_task_create(&principal, &project, Some(&w.bob), TaskDraft::default())
            .unwrap();
        assert_eq!(task.project_id, project.id);
        assert_eq!(task.assignee.map(|g| g.assignee_id), Some(w.bob.id));

        let denied =
            authorize_task_create(&principal, &project, Some(&w.carol), TaskDraft::default());
        assert!(matches!(denied, Err(AccessError::CrossTenantViolation(_))));
    }

    #[test]
    fn test_scopes_follow_principal() {
        let w = world();
        let principal = Principal::from_user(&w.alice);

        assert_eq!(authorize_project_read(&principal).user_id, w.alice.id);
        assert_eq!(authorize_user_list(&principal).company_id, w.alice.company_id);

        let project_id = Uuid::new_v4();
        let scope = authorize_task_read(&principal, Some(project_id));
        assert_eq!(scope.user_id, w.alice.id);
        assert_eq!(scope.project_id, Some(project_id));
    }

    #[test]
    fn test_task_update_assignment_accessors() {
        let grant = AssignGrant {
            project_id: Uuid::new_v4(),
            assignee_id: Uuid::new_v4(),
        };

        let keep = TaskUpdate::default();
        assert_eq!(keep.assigned_to(), None);
        assert_eq!(keep.assigned_project(), None);

        let clear = TaskUpdate::new(TaskChanges::default(), AssignmentChange::Clear);
        assert_eq!(clear.assigned_to(), Some(None));

        let assign = TaskUpdate::new(TaskChanges::default(), AssignmentChange::Assign(grant.clone()));
        assert_eq!(assign.assigned_to(), Some(Some(grant.assignee_id)));
        assert_eq!(assign.assigned_project(), Some(grant.project_id));
    }
}
