use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Returns the value of an optional patch field when it carries real content.
/// `None`, empty and whitespace-only strings all mean "leave unchanged".
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "course_category", rename_all = "UPPERCASE")]
pub enum Category {
    Frontend,
    Backend,
    Devops,
    Robotics,
    Ia,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Frontend,
        Category::Backend,
        Category::Devops,
        Category::Robotics,
        Category::Ia,
    ];

    pub fn description(self) -> &'static str {
        match self {
            Category::Frontend => "User interface development",
            Category::Backend => "Server-side logic development",
            Category::Devops => "Continuous integration and delivery",
            Category::Robotics => "Robotic systems development",
            Category::Ia => "Artificial intelligence",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "topic_status", rename_all = "UPPERCASE")]
pub enum TopicStatus {
    #[default]
    Open,
    Closed,
}

// ---------------------------------------------------------------- users

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never leaves the service
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub enabled: Option<bool>,
}

impl User {
    /// Builds an enabled account from a registration request. `id` is assigned by the store.
    pub fn register(new: &NewUser, password_hash: String) -> Self {
        Self {
            id: 0,
            username: new.username.trim().to_string(),
            email: new.email.trim().to_string(),
            password_hash,
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            role: new.role.unwrap_or_default(),
            enabled: true,
        }
    }

    /// `password_hash` is the already hashed replacement when the patch carried a password.
    pub fn apply_update(&mut self, patch: &UserPatch, password_hash: Option<String>) {
        if let Some(username) = present(&patch.username) { self.username = username.trim().to_string(); }
        if let Some(email) = present(&patch.email) { self.email = email.trim().to_string(); }
        if let Some(first) = present(&patch.first_name) { self.first_name = first.trim().to_string(); }
        if let Some(last) = present(&patch.last_name) { self.last_name = last.trim().to_string(); }
        if let Some(role) = patch.role { self.role = role; }
        if let Some(enabled) = patch.enabled { self.enabled = enabled; }
        if let Some(hash) = password_hash { self.password_hash = hash; }
    }

    pub fn soft_delete(&mut self) {
        self.enabled = false;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    #[schema(value_type = i64)]
    pub id: Id,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enabled: bool,
}

impl From<&User> for UserDetail {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            role: u.role,
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            email: u.email.clone(),
            enabled: u.enabled,
        }
    }
}

// -------------------------------------------------------------- courses

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: Id,
    pub name: String,
    pub category: Category,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCourse {
    #[serde(default)]
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CoursePatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub active: Option<bool>,
}

impl Course {
    pub fn new(new: &NewCourse) -> Self {
        Self { id: 0, name: new.name.trim().to_string(), category: new.category, active: true }
    }

    pub fn apply_update(&mut self, patch: &CoursePatch) {
        if let Some(name) = present(&patch.name) { self.name = name.trim().to_string(); }
        if let Some(category) = patch.category { self.category = category; }
        if let Some(active) = patch.active { self.active = active; }
    }

    pub fn soft_delete(&mut self) {
        self.active = false;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetail {
    #[schema(value_type = i64)]
    pub id: Id,
    pub name: String,
    pub category: Category,
    pub category_description: String,
    pub active: bool,
}

impl From<&Course> for CourseDetail {
    fn from(c: &Course) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            category: c.category,
            category_description: c.category.description().to_string(),
            active: c.active,
        }
    }
}

// --------------------------------------------------------------- topics

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Topic {
    pub id: Id,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TopicStatus,
    pub deleted: bool,
    pub author_id: Id,
    pub course_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTopic {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[schema(value_type = i64)]
    pub author_id: Id,
    #[schema(value_type = i64)]
    pub course_id: Id,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TopicPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub status: Option<TopicStatus>,
    #[schema(value_type = Option<i64>)]
    pub course_id: Option<Id>,
}

impl Topic {
    pub fn open(new: &NewTopic) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: new.title.trim().to_string(),
            message: new.message.trim().to_string(),
            created_at: now,
            updated_at: now,
            status: TopicStatus::Open,
            deleted: false,
            author_id: new.author_id,
            course_id: new.course_id,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == TopicStatus::Closed
    }

    /// Partial update. A requested `OPEN` is ignored: closing is terminal.
    pub fn apply_update(&mut self, patch: &TopicPatch) {
        if let Some(title) = present(&patch.title) { self.title = title.trim().to_string(); }
        if let Some(message) = present(&patch.message) { self.message = message.trim().to_string(); }
        if let Some(course_id) = patch.course_id { self.course_id = course_id; }
        if patch.status == Some(TopicStatus::Closed) { self.status = TopicStatus::Closed; }
        self.updated_at = Utc::now();
    }

    pub fn close(&mut self) {
        if !self.is_closed() {
            self.status = TopicStatus::Closed;
            self.updated_at = Utc::now();
        }
    }

    pub fn soft_delete(&mut self) {
        if !self.deleted {
            self.deleted = true;
            self.updated_at = Utc::now();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct TopicDetail {
    #[schema(value_type = i64)]
    pub id: Id,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: TopicStatus,
    pub deleted: bool,
    #[schema(value_type = i64)]
    pub author_id: Id,
    pub author: String, // author's username
    #[schema(value_type = i64)]
    pub course_id: Id,
    pub course: String, // course name
    pub category: Category,
}

impl TopicDetail {
    pub fn assemble(t: &Topic, author: &User, course: &Course) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            message: t.message.clone(),
            created_at: t.created_at,
            updated_at: t.updated_at,
            status: t.status,
            deleted: t.deleted,
            author_id: author.id,
            author: author.username.clone(),
            course_id: course.id,
            course: course.name.clone(),
            category: course.category,
        }
    }
}

// -------------------------------------------------------------- replies

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reply {
    pub id: Id,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub solution: bool,
    pub deleted: bool,
    pub author_id: Id,
    pub topic_id: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewReply {
    #[serde(default)]
    pub message: String,
    #[schema(value_type = i64)]
    pub author_id: Id,
    #[schema(value_type = i64)]
    pub topic_id: Id,
    #[serde(default)]
    pub solution: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReplyPatch {
    pub message: Option<String>,
    pub solution: Option<bool>,
}

impl Reply {
    /// Always starts as a plain reply; acceptance goes through [`Reply::mark_as_solution`].
    pub fn post(new: &NewReply) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            message: new.message.trim().to_string(),
            created_at: now,
            updated_at: now,
            solution: false,
            deleted: false,
            author_id: new.author_id,
            topic_id: new.topic_id,
        }
    }

    /// Updates the message only; the solution flag moves through [`Reply::mark_as_solution`].
    pub fn apply_update(&mut self, patch: &ReplyPatch) {
        if let Some(message) = present(&patch.message) { self.message = message.trim().to_string(); }
        self.updated_at = Utc::now();
    }

    /// Accepts this reply and closes its topic. Both must be written in one store operation.
    pub fn mark_as_solution(&mut self, topic: &mut Topic) {
        debug_assert_eq!(self.topic_id, topic.id, "reply belongs to a different topic");
        self.solution = true;
        self.updated_at = Utc::now();
        topic.close();
    }

    pub fn soft_delete(&mut self) {
        if !self.deleted {
            self.deleted = true;
            self.updated_at = Utc::now();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ReplyDetail {
    #[schema(value_type = i64)]
    pub id: Id,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub solution: bool,
    pub deleted: bool,
    #[schema(value_type = i64)]
    pub author_id: Id,
    pub author: String,
    #[schema(value_type = i64)]
    pub topic_id: Id,
    pub topic_title: String,
}

impl ReplyDetail {
    pub fn assemble(r: &Reply, author: &User, topic: &Topic) -> Self {
        Self {
            id: r.id,
            message: r.message.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
            solution: r.solution,
            deleted: r.deleted,
            author_id: author.id,
            author: author.username.clone(),
            topic_id: topic.id,
            topic_title: topic.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        let mut t = Topic::open(&NewTopic { title: " T1 ".into(), message: "body".into(), author_id: 1, course_id: 2 });
        t.id = 10;
        t
    }

    #[test]
    fn topic_starts_open_and_trimmed() {
        let t = topic();
        assert_eq!(t.status, TopicStatus::Open);
        assert_eq!(t.title, "T1");
        assert!(!t.deleted);
        assert_eq!(t.created_at, t.updated_at);
    }

    #[test]
    fn topic_update_never_reopens() {
        let mut t = topic();
        t.apply_update(&TopicPatch { status: Some(TopicStatus::Closed), ..Default::default() });
        assert!(t.is_closed());
        t.apply_update(&TopicPatch { status: Some(TopicStatus::Open), title: Some("new".into()), ..Default::default() });
        assert!(t.is_closed());
        assert_eq!(t.title, "new");
    }

    #[test]
    fn blank_patch_fields_leave_state_alone() {
        let mut t = topic();
        t.apply_update(&TopicPatch { title: Some("   ".into()), message: Some(String::new()), ..Default::default() });
        assert_eq!(t.title, "T1");
        assert_eq!(t.message, "body");
    }

    #[test]
    fn marking_solution_closes_topic() {
        let mut t = topic();
        let mut r = Reply::post(&NewReply { message: "answer".into(), author_id: 3, topic_id: 10, solution: true });
        assert!(!r.solution);
        r.mark_as_solution(&mut t);
        assert!(r.solution);
        assert!(t.is_closed());
    }

    #[test]
    fn soft_delete_is_idempotent() {
        let mut t = topic();
        t.soft_delete();
        let stamp = t.updated_at;
        t.soft_delete();
        assert!(t.deleted);
        assert_eq!(t.updated_at, stamp);
        assert_eq!(t.status, TopicStatus::Open);

        let mut c = Course::new(&NewCourse { name: "Rust".into(), category: Category::Backend });
        c.soft_delete();
        c.soft_delete();
        assert!(!c.active);
    }

    #[test]
    fn user_patch_keeps_hash_unless_replaced() {
        let new = NewUser {
            username: "ana".into(),
            email: "ana@x.com".into(),
            password: "secret".into(),
            first_name: "Ana".into(),
            last_name: "Gil".into(),
            role: None,
        };
        let mut u = User::register(&new, "hash-1".into());
        assert!(u.enabled);
        assert_eq!(u.role, Role::Student);
        u.apply_update(&UserPatch { email: Some("ana@y.com".into()), ..Default::default() }, None);
        assert_eq!(u.password_hash, "hash-1");
        assert_eq!(u.email, "ana@y.com");
        u.apply_update(&UserPatch::default(), Some("hash-2".into()));
        assert_eq!(u.password_hash, "hash-2");
    }

    #[test]
    fn every_category_has_a_description() {
        for c in Category::ALL {
            assert!(!c.description().is_empty());
        }
        assert_eq!(serde_json::to_string(&Category::Ia).unwrap(), "\"IA\"");
        assert_eq!(serde_json::to_string(&Category::Devops).unwrap(), "\"DEVOPS\"");
    }
}
