/// In-memory store
///
/// All records live in maps behind one `tokio::sync::RwLock`. Each operation
/// takes the lock once, so member adds and email uniqueness checks are
/// atomic with respect to each other.
///
/// Used by the API integration tests and with `STORE_BACKEND=memory`.
/// Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{update_project_filter, Store, StoreError};
use crate::auth::access::{
    MemberGrant, NewProject, NewTask, Principal, ProjectScope, TaskScope, TaskUpdate, UserScope,
};
use crate::models::company::{company_name_key, Company};
use crate::models::project::{Project, ProjectStatus};
use crate::models::task::{next_updated_at, Task, TaskStats};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User};

#[derive(Debug, Default)]
struct State {
    companies: HashMap<Uuid, Company>,
    company_keys: HashMap<String, Uuid>,
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

impl State {
    fn project_visible(&self, project_id: Uuid, user_id: Uuid) -> bool {
        self.projects
            .get(&project_id)
            .is_some_and(|p| p.is_visible_to(user_id))
    }

    fn task_in_scope(&self, task: &Task, user_id: Uuid, project_id: Option<Uuid>) -> bool {
        project_id.map_or(true, |p| task.project_id == p)
            && self.project_visible(task.project_id, user_id)
    }
}

/// [`Store`] held entirely in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by ID for a stable order
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_or_create_company(&self, name: &str) -> Result<Company, StoreError> {
        let key = company_name_key(name);
        let mut state = self.state.write().await;

        if let Some(company) = state
            .company_keys
            .get(&key)
            .and_then(|id| state.companies.get(id))
        {
            return Ok(company.clone());
        }

        let company = Company {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            name_key: key.clone(),
            created_at: Utc::now(),
        };
        state.company_keys.insert(key, company.id);
        state.companies.insert(company.id, company.clone());

        Ok(company)
    }

    async fn find_company(&self, id: Uuid) -> Result<Option<Company>, StoreError> {
        Ok(self.state.read().await.companies.get(&id).cloned())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let email = normalize_email(&data.email);
        let mut state = self.state.write().await;

        if state.emails.contains_key(&email) {
            return Err(StoreError::Duplicate { field: "email" });
        }
        if !state.companies.contains_key(&data.company_id) {
            return Err(StoreError::Missing("Company"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: email.clone(),
            password_hash: data.password_hash,
            company_id: data.company_id,
            created_at: now,
            updated_at: now,
        };
        state.emails.insert(email, user.id);
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .get(&normalize_email(email))
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn update_user(
        &self,
        principal: &Principal,
        changes: UpdateUser,
    ) -> Result<Option<User>, StoreError> {
        let mut state = self.state.write().await;
        let user_id = principal.user_id();

        let Some(current_email) = state.users.get(&user_id).map(|u| u.email.clone()) else {
            return Ok(None);
        };

        let new_email = changes.email.as_deref().map(normalize_email);
        if let Some(email) = &new_email {
            if state.emails.get(email).is_some_and(|owner| *owner != user_id) {
                return Err(StoreError::Duplicate { field: "email" });
            }
            state.emails.remove(&current_email);
            state.emails.insert(email.clone(), user_id);
        }

        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = new_email {
            user.email = email;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn list_users(&self, scope: &UserScope) -> Result<Vec<User>, StoreError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.company_id == scope.company_id)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(users)
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&project.owner_id) {
            return Err(StoreError::Missing("Owner"));
        }

        let record = Project {
            id: Uuid::new_v4(),
            name: project.name,
            description: project.description,
            owner_id: project.owner_id,
            company_id: project.company_id,
            members: vec![project.owner_id],
            status: ProjectStatus::default(),
            created_at: Utc::now(),
        };
        state.projects.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, scope: &ProjectScope) -> Result<Vec<Project>, StoreError> {
        let state = self.state.read().await;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| p.is_visible_to(scope.user_id))
            .cloned()
            .collect();
        newest_first(&mut projects, |p| (p.created_at, p.id));
        Ok(projects)
    }

    async fn count_projects(&self, scope: &ProjectScope) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        let count = state
            .projects
            .values()
            .filter(|p| p.is_visible_to(scope.user_id))
            .count();
        Ok(count as i64)
    }

    async fn add_member(&self, grant: &MemberGrant) -> Result<Option<Project>, StoreError> {
        let mut state = self.state.write().await;

        let Some(project) = state.projects.get_mut(&grant.project_id) else {
            return Ok(None);
        };

        let inserted = !project.members.contains(&grant.user_id);
        if inserted {
            project.members.push(grant.user_id);
        }

        tracing::debug!(
            project_id = %grant.project_id,
            user_id = %grant.user_id,
            inserted,
            "Project member add"
        );

        Ok(Some(project.clone()))
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;

        if !state.projects.contains_key(&task.project_id) {
            return Err(StoreError::Missing("Project"));
        }

        let now = Utc::now();
        let draft = task.draft;
        let record = Task {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            project_id: task.project_id,
            assigned_to_id: task.assignee.map(|grant| grant.assignee_id),
            status: draft.status,
            priority: draft.priority,
            deadline: draft.deadline,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_task(&self, scope: &TaskScope, id: Uuid) -> Result<Option<Task>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .get(&id)
            .filter(|t| state.task_in_scope(t, scope.user_id, scope.project_id))
            .cloned())
    }

    async fn list_tasks(&self, scope: &TaskScope) -> Result<Vec<Task>, StoreError> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| state.task_in_scope(t, scope.user_id, scope.project_id))
            .cloned()
            .collect();
        newest_first(&mut tasks, |t| (t.created_at, t.id));
        Ok(tasks)
    }

    async fn update_task(
        &self,
        scope: &TaskScope,
        id: Uuid,
        update: TaskUpdate,
    ) -> Result<Option<Task>, StoreError> {
        let Ok(project_id) = update_project_filter(scope, &update) else {
            return Ok(None);
        };

        let mut state = self.state.write().await;

        let in_scope = state
            .tasks
            .get(&id)
            .is_some_and(|t| state.task_in_scope(t, scope.user_id, project_id));
        if !in_scope {
            return Ok(None);
        }

        let assigned_to_id = update.assigned_to();
        let changes = update.changes;
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(deadline) = changes.deadline {
            task.deadline = deadline;
        }
        if let Some(assigned_to_id) = assigned_to_id {
            task.assigned_to_id = assigned_to_id;
        }
        task.updated_at = next_updated_at(task.updated_at);

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, scope: &TaskScope, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;

        let in_scope = state
            .tasks
            .get(&id)
            .is_some_and(|t| state.task_in_scope(t, scope.user_id, scope.project_id));
        if in_scope {
            state.tasks.remove(&id);
        }

        Ok(in_scope)
    }

    async fn task_stats(&self, principal: &Principal) -> Result<TaskStats, StoreError> {
        let state = self.state.read().await;
        let user_id = principal.user_id();
        Ok(TaskStats::tally(
            state
                .tasks
                .values()
                .filter(|t| t.assigned_to_id == Some(user_id)),
        ))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::access::{
        authorize_member_add, authorize_project_create, authorize_project_read,
        authorize_task_create, authorize_task_read, authorize_user_list, resolve_principal,
        AssignmentChange, MemberAddPolicy, ProjectDraft, TaskChanges, TaskDraft,
    };
    use crate::models::task::TaskStatus;

    async fn register(store: &MemoryStore, name: &str, email: &str, company: &str) -> Principal {
        let company = store.find_or_create_company(company).await.unwrap();
        let user = store
            .create_user(CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                company_id: company.id,
            })
            .await
            .unwrap();
        resolve_principal(store, user.id).await.unwrap()
    }

    async fn new_project(store: &MemoryStore, owner: &Principal) -> Project {
        let draft = ProjectDraft {
            name: "Apollo".to_string(),
            description: None,
        };
        store
            .create_project(authorize_project_create(owner, draft))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_company_lookup_is_normalized() {
        let store = MemoryStore::new();
        let a = store.find_or_create_company("Acme").await.unwrap();
        let b = store.find_or_create_company("  ACME ").await.unwrap();
        let c = store.find_or_create_company("Globex").await.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Acme");
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let store = MemoryStore::new();
        register(&store, "Ada", "ada@acme.test", "Acme").await;

        let company = store.find_or_create_company("Acme").await.unwrap();
        let result = store
            .create_user(CreateUser {
                name: "Ada 2".to_string(),
                email: "ADA@acme.test".to_string(),
                password_hash: "hash".to_string(),
                company_id: company.id,
            })
            .await;

        assert!(matches!(result, Err(StoreError::Duplicate { field: "email" })));
    }

    #[tokio::test]
    async fn test_update_user_email_collision() {
        let store = MemoryStore::new();
        let ada = register(&store, "Ada", "ada@acme.test", "Acme").await;
        register(&store, "Bob", "bob@acme.test", "Acme").await;

        let result = store
            .update_user(
                &ada,
                UpdateUser {
                    name: None,
                    email: Some("bob@acme.test".to_string()),
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));

        let updated = store
            .update_user(
                &ada,
                UpdateUser {
                    name: Some("Ada L".to_string()),
                    email: Some("Ada@Lovelace.test".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.email, "ada@lovelace.test");
        assert!(store.find_user_by_email("ada@acme.test").await.unwrap().is_none());
        assert!(store.find_user_by_email("ada@lovelace.test").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_project_scope_and_member_add_idempotent() {
        let store = MemoryStore::new();
        let alice = register(&store, "Alice", "alice@acme.test", "Acme").await;
        let bob = register(&store, "Bob", "bob@acme.test", "Acme").await;

        let project = new_project(&store, &alice).await;
        assert_eq!(project.members, vec![alice.user_id()]);
        assert!(store
            .list_projects(&authorize_project_read(&bob))
            .await
            .unwrap()
            .is_empty());

        let bob_user = store.find_user(bob.user_id()).await.unwrap().unwrap();
        let grant =
            authorize_member_add(MemberAddPolicy::SameCompany, &alice, &project, &bob_user)
                .unwrap();

        let once = store.add_member(&grant).await.unwrap().unwrap();
        let twice = store.add_member(&grant).await.unwrap().unwrap();
        assert_eq!(once.members.len(), 2);
        assert_eq!(twice.members, once.members);
        assert_eq!(twice.company_id, alice.company_id());

        assert_eq!(
            store.count_projects(&authorize_project_read(&bob)).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_member_adds_do_not_duplicate() {
        let store = MemoryStore::new();
        let alice = register(&store, "Alice", "alice@acme.test", "Acme").await;
        let bob = register(&store, "Bob", "bob@acme.test", "Acme").await;
        let project = new_project(&store, &alice).await;
        let bob_user = store.find_user(bob.user_id()).await.unwrap().unwrap();
        let grant =
            authorize_member_add(MemberAddPolicy::SameCompany, &alice, &project, &bob_user)
                .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let grant = grant.clone();
                tokio::spawn(async move { store.add_member(&grant).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let project = store.find_project(project.id).await.unwrap().unwrap();
        assert_eq!(project.members, vec![alice.user_id(), bob.user_id()]);
    }

    #[tokio::test]
    async fn test_user_scope_excludes_other_companies() {
        let store = MemoryStore::new();
        let alice = register(&store, "Alice", "alice@acme.test", "Acme").await;
        register(&store, "Bob", "bob@acme.test", "Acme").await;
        register(&store, "Carol", "carol@globex.test", "Globex").await;

        let users = store.list_users(&authorize_user_list(&alice)).await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_task_scope_and_update() {
        let store = MemoryStore::new();
        let alice = register(&store, "Alice", "alice@acme.test", "Acme").await;
        let bob = register(&store, "Bob", "bob@acme.test", "Acme").await;
        let project = new_project(&store, &alice).await;

        let draft = TaskDraft {
            title: "Write report".to_string(),
            ..Default::default()
        };
        let new_task = authorize_task_create(&alice, &project, None, draft).unwrap();
        let task = store.create_task(new_task).await.unwrap();

        // Bob is not a member, so the task is out of his scope
        let bob_scope = authorize_task_read(&bob, None);
        assert!(store.find_task(&bob_scope, task.id).await.unwrap().is_none());
        assert!(store
            .update_task(&bob_scope, task.id, TaskUpdate::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_task(&bob_scope, task.id).await.unwrap());

        let alice_scope = authorize_task_read(&alice, None);
        let changes = TaskChanges {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        let updated = store
            .update_task(
                &alice_scope,
                task.id,
                TaskUpdate::new(changes, AssignmentChange::Keep),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.title, "Write report");

        let other_project = authorize_task_read(&alice, Some(Uuid::new_v4()));
        assert!(store.list_tasks(&other_project).await.unwrap().is_empty());
        assert_eq!(store.list_tasks(&alice_scope).await.unwrap().len(), 1);

        assert!(store.delete_task(&alice_scope, task.id).await.unwrap());
        assert!(store.list_tasks(&alice_scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_task_stats_count_assigned_tasks() {
        let store = MemoryStore::new();
        let alice = register(&store, "Alice", "alice@acme.test", "Acme").await;
        let project = new_project(&store, &alice).await;
        let alice_user = store.find_user(alice.user_id()).await.unwrap().unwrap();

        for status in [TaskStatus::Completed, TaskStatus::Todo, TaskStatus::InProgress] {
            let draft = TaskDraft {
                title: "t".to_string(),
                status,
                ..Default::default()
            };
            let new_task =
                authorize_task_create(&alice, &project, Some(&alice_user), draft).unwrap();
            store.create_task(new_task).await.unwrap();
        }

        let stats = store.task_stats(&alice).await.unwrap();
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.pending_tasks, 2);
        assert_eq!(stats.total_tasks, 3);
    }
}
