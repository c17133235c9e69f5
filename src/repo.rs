use async_trait::async_trait;

use crate::models::*;
use crate::paging::{Direction, Page, PageRequest, Sort};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("{0} not found")] NotFound(&'static str),
    #[error("conflict: {0}")] Conflict(String),
    #[error("store failure: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Which rows a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// enabled users, active courses, non-deleted topics and replies
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFilter {
    All,
    Active,
    /// non-deleted replies of one topic
    Topic(Id),
    /// non-deleted replies of one author
    Author(Id),
}

pub fn user_sort() -> Sort { Sort::new("id", Direction::Asc) }
pub fn course_sort() -> Sort { Sort::new("id", Direction::Asc) }
pub fn topic_sort() -> Sort { Sort::new("updated_at", Direction::Desc) }
pub fn reply_sort() -> Sort { Sort::new("updated_at", Direction::Asc) }

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Stores a new user; the incoming `id` is ignored. Duplicate username/email → `Conflict`.
    async fn insert_user(&self, user: User) -> RepoResult<User>;
    async fn save_user(&self, user: &User) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<User>>;
}

#[async_trait]
pub trait CourseRepo: Send + Sync {
    async fn insert_course(&self, course: Course) -> RepoResult<Course>;
    async fn save_course(&self, course: &Course) -> RepoResult<Course>;
    async fn get_course(&self, id: Id) -> RepoResult<Course>;
    async fn list_courses(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<Course>>;
}

#[async_trait]
pub trait TopicRepo: Send + Sync {
    async fn insert_topic(&self, topic: Topic) -> RepoResult<Topic>;
    async fn save_topic(&self, topic: &Topic) -> RepoResult<Topic>;
    async fn get_topic(&self, id: Id) -> RepoResult<Topic>;
    async fn topic_detail(&self, id: Id) -> RepoResult<TopicDetail>;
    async fn list_topics(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<TopicDetail>>;
    /// A non-deleted OPEN topic with exactly this title and message, other than `excluding`.
    async fn find_open_topic(&self, title: &str, message: &str, excluding: Option<Id>) -> RepoResult<Option<Topic>>;
}

#[async_trait]
pub trait ReplyRepo: Send + Sync {
    /// Stores a new reply. When `closing` is given (the reply was accepted as solution)
    /// the topic is written in the same atomic operation.
    async fn insert_reply(&self, reply: Reply, closing: Option<&Topic>) -> RepoResult<Reply>;
    async fn save_reply(&self, reply: &Reply, closing: Option<&Topic>) -> RepoResult<Reply>;
    async fn get_reply(&self, id: Id) -> RepoResult<Reply>;
    async fn reply_detail(&self, id: Id) -> RepoResult<ReplyDetail>;
    async fn list_replies(&self, filter: ReplyFilter, page: PageRequest) -> RepoResult<Page<ReplyDetail>>;
    /// The non-deleted accepted reply of a topic, if any.
    async fn find_solution(&self, topic_id: Id) -> RepoResult<Option<Reply>>;
}

pub trait Repo: UserRepo + CourseRepo + TopicRepo + ReplyRepo {}

impl<T> Repo for T where T: UserRepo + CourseRepo + TopicRepo + ReplyRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
    use tracing::{info, warn};

    const SNAPSHOT_FILE: &str = "state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct Sequences {
        user: Id,
        course: Id,
        topic: Id,
        reply: Id,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        users: BTreeMap<Id, User>,
        courses: BTreeMap<Id, Course>,
        topics: BTreeMap<Id, Topic>,
        replies: BTreeMap<Id, Reply>,
        seq: Sequences,
    }

    impl State {
        fn user(&self, id: Id) -> RepoResult<&User> {
            self.users.get(&id).ok_or(RepoError::NotFound("user"))
        }
        fn course(&self, id: Id) -> RepoResult<&Course> {
            self.courses.get(&id).ok_or(RepoError::NotFound("course"))
        }
        fn topic(&self, id: Id) -> RepoResult<&Topic> {
            self.topics.get(&id).ok_or(RepoError::NotFound("topic"))
        }
        fn reply(&self, id: Id) -> RepoResult<&Reply> {
            self.replies.get(&id).ok_or(RepoError::NotFound("reply"))
        }

        fn username_or_email_taken(&self, user: &User) -> Option<String> {
            self.users.values().filter(|u| u.id != user.id).find_map(|u| {
                if u.username == user.username {
                    Some(format!("username '{}' is already taken", user.username))
                } else if u.email.eq_ignore_ascii_case(&user.email) {
                    Some(format!("email '{}' is already registered", user.email))
                } else {
                    None
                }
            })
        }

        /// Mirrors the partial unique index of the Postgres schema.
        fn second_solution(&self, reply: &Reply) -> bool {
            reply.solution
                && !reply.deleted
                && self.replies.values().any(|r| {
                    r.topic_id == reply.topic_id && r.id != reply.id && r.solution && !r.deleted
                })
        }

        // Only the status columns are taken from the caller's copy, which may be stale.
        fn close_topic(&mut self, closed: &Topic) -> RepoResult<()> {
            let t = self.topics.get_mut(&closed.id).ok_or(RepoError::NotFound("topic"))?;
            t.status = closed.status;
            t.updated_at = closed.updated_at;
            Ok(())
        }

        fn topic_detail(&self, t: &Topic) -> RepoResult<TopicDetail> {
            Ok(TopicDetail::assemble(t, self.user(t.author_id)?, self.course(t.course_id)?))
        }

        fn reply_detail(&self, r: &Reply) -> RepoResult<ReplyDetail> {
            Ok(ReplyDetail::assemble(r, self.user(r.author_id)?, self.topic(r.topic_id)?))
        }
    }

    /// In-memory store. Every write holds the state lock for its whole critical
    /// section, which is what makes reply + topic writes atomic here.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Option<Arc<PathBuf>>,
    }

    impl InMemRepo {
        /// Empty store, nothing written to disk.
        pub fn new() -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
        }

        /// Store backed by `<dir>/state.json`: loaded now, rewritten after every write.
        pub fn with_snapshot(dir: &Path) -> Self {
            let path = dir.join(SNAPSHOT_FILE);
            let state = Self::load_state_from(&path);
            Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        info!(path = %path.display(), users = s.users.len(), topics = s.topics.len(), "loaded snapshot");
                        s
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unreadable snapshot, starting empty");
                        State::default()
                    }
                },
                Err(e) => {
                    info!(path = %path.display(), error = %e, "no snapshot, starting empty");
                    State::default()
                }
            }
        }

        /// Serializes `state` while the caller still holds the write guard, then
        /// swaps the file in with a rename so a reader never sees a partial snapshot.
        fn persist(&self, state: &State) -> RepoResult<()> {
            let Some(path) = self.snapshot_path.as_deref() else { return Ok(()) };
            let bytes = serde_json::to_vec_pretty(state)
                .map_err(|e| RepoError::Internal(format!("snapshot serialization failed: {e}")))?;
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| RepoError::Internal(format!("snapshot dir {}: {e}", dir.display())))?;
            }
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, bytes)
                .and_then(|_| std::fs::rename(&tmp, path))
                .map_err(|e| {
                    warn!(path = %path.display(), error = %e, "failed to write snapshot");
                    RepoError::Internal(format!("snapshot write failed: {e}"))
                })
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn next_id(counter: &mut Id) -> Id {
            *counter += 1;
            *counter
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn insert_user(&self, mut user: User) -> RepoResult<User> {
            let mut s = self.write()?;
            user.id = 0;
            if let Some(reason) = s.username_or_email_taken(&user) {
                return Err(RepoError::Conflict(reason));
            }
            user.id = Self::next_id(&mut s.seq.user);
            s.users.insert(user.id, user.clone());
            self.persist(&s)?;
            Ok(user)
        }

        async fn save_user(&self, user: &User) -> RepoResult<User> {
            let mut s = self.write()?;
            s.user(user.id)?;
            if let Some(reason) = s.username_or_email_taken(user) {
                return Err(RepoError::Conflict(reason));
            }
            s.users.insert(user.id, user.clone());
            self.persist(&s)?;
            Ok(user.clone())
        }

        async fn get_user(&self, id: Id) -> RepoResult<User> {
            self.read()?.user(id).cloned()
        }

        async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            Ok(self.read()?.users.values().find(|u| u.username == username).cloned())
        }

        async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            Ok(self.read()?.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
        }

        async fn list_users(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<User>> {
            let s = self.read()?;
            // BTreeMap iteration is already id ascending
            let v: Vec<User> = s.users.values()
                .filter(|u| scope == Scope::All || u.enabled)
                .cloned()
                .collect();
            Ok(page.slice(v, user_sort()))
        }
    }

    #[async_trait]
    impl CourseRepo for InMemRepo {
        async fn insert_course(&self, mut course: Course) -> RepoResult<Course> {
            let mut s = self.write()?;
            course.id = Self::next_id(&mut s.seq.course);
            s.courses.insert(course.id, course.clone());
            self.persist(&s)?;
            Ok(course)
        }

        async fn save_course(&self, course: &Course) -> RepoResult<Course> {
            let mut s = self.write()?;
            s.course(course.id)?;
            s.courses.insert(course.id, course.clone());
            self.persist(&s)?;
            Ok(course.clone())
        }

        async fn get_course(&self, id: Id) -> RepoResult<Course> {
            self.read()?.course(id).cloned()
        }

        async fn list_courses(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<Course>> {
            let s = self.read()?;
            let v: Vec<Course> = s.courses.values()
                .filter(|c| scope == Scope::All || c.active)
                .cloned()
                .collect();
            Ok(page.slice(v, course_sort()))
        }
    }

    #[async_trait]
    impl TopicRepo for InMemRepo {
        async fn insert_topic(&self, mut topic: Topic) -> RepoResult<Topic> {
            let mut s = self.write()?;
            s.user(topic.author_id)?;
            s.course(topic.course_id)?;
            topic.id = Self::next_id(&mut s.seq.topic);
            s.topics.insert(topic.id, topic.clone());
            self.persist(&s)?;
            Ok(topic)
        }

        async fn save_topic(&self, topic: &Topic) -> RepoResult<Topic> {
            let mut s = self.write()?;
            s.topic(topic.id)?;
            s.course(topic.course_id)?;
            s.topics.insert(topic.id, topic.clone());
            self.persist(&s)?;
            Ok(topic.clone())
        }

        async fn get_topic(&self, id: Id) -> RepoResult<Topic> {
            self.read()?.topic(id).cloned()
        }

        async fn topic_detail(&self, id: Id) -> RepoResult<TopicDetail> {
            let s = self.read()?;
            s.topic_detail(s.topic(id)?)
        }

        async fn list_topics(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<TopicDetail>> {
            let s = self.read()?;
            let mut v: Vec<&Topic> = s.topics.values()
                .filter(|t| scope == Scope::All || !t.deleted)
                .collect();
            v.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));   // latest first
            let total = v.len() as u64;
            let content = v.into_iter()
                .skip(page.offset() as usize)
                .take(page.size as usize)
                .map(|t| s.topic_detail(t))
                .collect::<RepoResult<Vec<_>>>()?;
            Ok(Page::new(content, page, total, topic_sort()))
        }

        async fn find_open_topic(&self, title: &str, message: &str, excluding: Option<Id>) -> RepoResult<Option<Topic>> {
            let s = self.read()?;
            Ok(s.topics.values()
                .find(|t| {
                    Some(t.id) != excluding
                        && !t.deleted
                        && !t.is_closed()
                        && t.title == title
                        && t.message == message
                })
                .cloned())
        }
    }

    #[async_trait]
    impl ReplyRepo for InMemRepo {
        async fn insert_reply(&self, mut reply: Reply, closing: Option<&Topic>) -> RepoResult<Reply> {
            let mut s = self.write()?;
            s.user(reply.author_id)?;
            s.topic(reply.topic_id)?;
            if let Some(topic) = closing {
                s.topic(topic.id)?;
            }
            reply.id = 0;
            if s.second_solution(&reply) {
                return Err(RepoError::Conflict(format!("topic {} already has an accepted solution", reply.topic_id)));
            }
            reply.id = Self::next_id(&mut s.seq.reply);
            s.replies.insert(reply.id, reply.clone());
            if let Some(topic) = closing {
                s.close_topic(topic)?;
            }
            self.persist(&s)?;
            Ok(reply)
        }

        async fn save_reply(&self, reply: &Reply, closing: Option<&Topic>) -> RepoResult<Reply> {
            let mut s = self.write()?;
            s.reply(reply.id)?;
            if let Some(topic) = closing {
                s.topic(topic.id)?;
            }
            if s.second_solution(reply) {
                return Err(RepoError::Conflict(format!("topic {} already has an accepted solution", reply.topic_id)));
            }
            s.replies.insert(reply.id, reply.clone());
            if let Some(topic) = closing {
                s.close_topic(topic)?;
            }
            self.persist(&s)?;
            Ok(reply.clone())
        }

        async fn get_reply(&self, id: Id) -> RepoResult<Reply> {
            self.read()?.reply(id).cloned()
        }

        async fn reply_detail(&self, id: Id) -> RepoResult<ReplyDetail> {
            let s = self.read()?;
            s.reply_detail(s.reply(id)?)
        }

        async fn list_replies(&self, filter: ReplyFilter, page: PageRequest) -> RepoResult<Page<ReplyDetail>> {
            let s = self.read()?;
            let mut v: Vec<&Reply> = s.replies.values()
                .filter(|r| match filter {
                    ReplyFilter::All => true,
                    ReplyFilter::Active => !r.deleted,
                    ReplyFilter::Topic(id) => !r.deleted && r.topic_id == id,
                    ReplyFilter::Author(id) => !r.deleted && r.author_id == id,
                })
                .collect();
            v.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));   // ascending
            let total = v.len() as u64;
            let content = v.into_iter()
                .skip(page.offset() as usize)
                .take(page.size as usize)
                .map(|r| s.reply_detail(r))
                .collect::<RepoResult<Vec<_>>>()?;
            Ok(Page::new(content, page, total, reply_sort()))
        }

        async fn find_solution(&self, topic_id: Id) -> RepoResult<Option<Reply>> {
            let s = self.read()?;
            Ok(s.replies.values()
                .find(|r| r.topic_id == topic_id && r.solution && !r.deleted)
                .cloned())
        }
    }

}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};
    use tracing::error;

    const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, enabled";
    const TOPIC_COLUMNS: &str = "id, title, message, created_at, updated_at, status, deleted, author_id, course_id";
    const REPLY_COLUMNS: &str = "id, message, created_at, updated_at, solution, deleted, author_id, topic_id";

    const TOPIC_DETAIL_SELECT: &str = r#"
        SELECT t.id, t.title, t.message, t.created_at, t.updated_at, t.status, t.deleted,
               t.author_id, u.username AS author, t.course_id, c.name AS course, c.category
        FROM topics t
        JOIN users u ON u.id = t.author_id
        JOIN courses c ON c.id = t.course_id
    "#;

    const REPLY_DETAIL_SELECT: &str = r#"
        SELECT r.id, r.message, r.created_at, r.updated_at, r.solution, r.deleted,
               r.author_id, u.username AS author, r.topic_id, t.title AS topic_title
        FROM replies r
        JOIN users u ON u.id = r.author_id
        JOIN topics t ON t.id = r.topic_id
    "#;

    /// Maps driver errors onto the repository taxonomy. Unique and foreign-key
    /// violations are caller errors; everything else is a store failure.
    fn store_err(e: sqlx::Error) -> RepoError {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                let reason = match db.constraint() {
                    Some("users_username_key") => "username is already taken".to_string(),
                    Some("users_email_key") => "email is already registered".to_string(),
                    Some("replies_one_solution_per_topic") => "topic already has an accepted solution".to_string(),
                    other => format!("unique constraint {} violated", other.unwrap_or("?")),
                };
                return RepoError::Conflict(reason);
            }
            if db.is_foreign_key_violation() {
                return RepoError::NotFound("referenced record");
            }
        }
        error!(error = %e, "postgres query failed");
        RepoError::Internal(e.to_string())
    }

    fn limit_offset(page: PageRequest) -> (i64, i64) {
        (i64::from(page.size), page.offset() as i64)
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn insert_user(&self, user: User) -> RepoResult<User> {
            let sql = format!(
                "INSERT INTO users (username, email, password_hash, first_name, last_name, role, enabled) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7) RETURNING {USER_COLUMNS}"
            );
            sqlx::query_as::<_, User>(&sql)
                .bind(&user.username).bind(&user.email).bind(&user.password_hash)
                .bind(&user.first_name).bind(&user.last_name).bind(user.role).bind(user.enabled)
                .fetch_one(&self.pool).await.map_err(store_err)
        }

        async fn save_user(&self, user: &User) -> RepoResult<User> {
            let sql = format!(
                "UPDATE users SET username=$2, email=$3, password_hash=$4, first_name=$5, last_name=$6, role=$7, enabled=$8 \
                 WHERE id=$1 RETURNING {USER_COLUMNS}"
            );
            sqlx::query_as::<_, User>(&sql)
                .bind(user.id).bind(&user.username).bind(&user.email).bind(&user.password_hash)
                .bind(&user.first_name).bind(&user.last_name).bind(user.role).bind(user.enabled)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("user"))
        }

        async fn get_user(&self, id: Id) -> RepoResult<User> {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id=$1");
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("user"))
        }

        async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username=$1");
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .fetch_optional(&self.pool).await.map_err(store_err)
        }

        async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email)=lower($1)");
            sqlx::query_as::<_, User>(&sql)
                .bind(email)
                .fetch_optional(&self.pool).await.map_err(store_err)
        }

        async fn list_users(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<User>> {
            let all = scope == Scope::All;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1 OR enabled)")
                .bind(all)
                .fetch_one(&self.pool).await.map_err(store_err)?;
            let (limit, offset) = limit_offset(page);
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE ($1 OR enabled) ORDER BY id ASC LIMIT $2 OFFSET $3");
            let rows = sqlx::query_as::<_, User>(&sql)
                .bind(all).bind(limit).bind(offset)
                .fetch_all(&self.pool).await.map_err(store_err)?;
            Ok(Page::new(rows, page, total as u64, user_sort()))
        }
    }

    #[async_trait]
    impl CourseRepo for PgRepo {
        async fn insert_course(&self, course: Course) -> RepoResult<Course> {
            sqlx::query_as::<_, Course>(
                "INSERT INTO courses (name, category, active) VALUES ($1,$2,$3) RETURNING id, name, category, active"
            )
            .bind(&course.name).bind(course.category).bind(course.active)
            .fetch_one(&self.pool).await.map_err(store_err)
        }

        async fn save_course(&self, course: &Course) -> RepoResult<Course> {
            sqlx::query_as::<_, Course>(
                "UPDATE courses SET name=$2, category=$3, active=$4 WHERE id=$1 RETURNING id, name, category, active"
            )
            .bind(course.id).bind(&course.name).bind(course.category).bind(course.active)
            .fetch_optional(&self.pool).await.map_err(store_err)?
            .ok_or(RepoError::NotFound("course"))
        }

        async fn get_course(&self, id: Id) -> RepoResult<Course> {
            sqlx::query_as::<_, Course>("SELECT id, name, category, active FROM courses WHERE id=$1")
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("course"))
        }

        async fn list_courses(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<Course>> {
            let all = scope == Scope::All;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE ($1 OR active)")
                .bind(all)
                .fetch_one(&self.pool).await.map_err(store_err)?;
            let (limit, offset) = limit_offset(page);
            let rows = sqlx::query_as::<_, Course>(
                "SELECT id, name, category, active FROM courses WHERE ($1 OR active) ORDER BY id ASC LIMIT $2 OFFSET $3"
            )
            .bind(all).bind(limit).bind(offset)
            .fetch_all(&self.pool).await.map_err(store_err)?;
            Ok(Page::new(rows, page, total as u64, course_sort()))
        }
    }

    #[async_trait]
    impl TopicRepo for PgRepo {
        async fn insert_topic(&self, topic: Topic) -> RepoResult<Topic> {
            let sql = format!(
                "INSERT INTO topics (title, message, created_at, updated_at, status, deleted, author_id, course_id) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8) RETURNING {TOPIC_COLUMNS}"
            );
            sqlx::query_as::<_, Topic>(&sql)
                .bind(&topic.title).bind(&topic.message).bind(topic.created_at).bind(topic.updated_at)
                .bind(topic.status).bind(topic.deleted).bind(topic.author_id).bind(topic.course_id)
                .fetch_one(&self.pool).await.map_err(store_err)
        }

        async fn save_topic(&self, topic: &Topic) -> RepoResult<Topic> {
            let sql = format!(
                "UPDATE topics SET title=$2, message=$3, updated_at=$4, status=$5, deleted=$6, course_id=$7 \
                 WHERE id=$1 RETURNING {TOPIC_COLUMNS}"
            );
            sqlx::query_as::<_, Topic>(&sql)
                .bind(topic.id).bind(&topic.title).bind(&topic.message).bind(topic.updated_at)
                .bind(topic.status).bind(topic.deleted).bind(topic.course_id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("topic"))
        }

        async fn get_topic(&self, id: Id) -> RepoResult<Topic> {
            let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id=$1");
            sqlx::query_as::<_, Topic>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("topic"))
        }

        async fn topic_detail(&self, id: Id) -> RepoResult<TopicDetail> {
            let sql = format!("{TOPIC_DETAIL_SELECT} WHERE t.id = $1");
            sqlx::query_as::<_, TopicDetail>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("topic"))
        }

        async fn list_topics(&self, scope: Scope, page: PageRequest) -> RepoResult<Page<TopicDetail>> {
            let all = scope == Scope::All;
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM topics WHERE ($1 OR NOT deleted)")
                .bind(all)
                .fetch_one(&self.pool).await.map_err(store_err)?;
            let (limit, offset) = limit_offset(page);
            let sql = format!(
                "{TOPIC_DETAIL_SELECT} WHERE ($1 OR NOT t.deleted) ORDER BY t.updated_at DESC, t.id DESC LIMIT $2 OFFSET $3"
            );
            let rows = sqlx::query_as::<_, TopicDetail>(&sql)
                .bind(all).bind(limit).bind(offset)
                .fetch_all(&self.pool).await.map_err(store_err)?;
            Ok(Page::new(rows, page, total as u64, topic_sort()))
        }

        async fn find_open_topic(&self, title: &str, message: &str, excluding: Option<Id>) -> RepoResult<Option<Topic>> {
            let sql = format!(
                "SELECT {TOPIC_COLUMNS} FROM topics \
                 WHERE title=$1 AND message=$2 AND NOT deleted AND status='OPEN' \
                   AND ($3::BIGINT IS NULL OR id <> $3) \
                 LIMIT 1"
            );
            sqlx::query_as::<_, Topic>(&sql)
                .bind(title).bind(message).bind(excluding)
                .fetch_optional(&self.pool).await.map_err(store_err)
        }
    }

    impl PgRepo {
        async fn close_topic<'c>(tx: &mut sqlx::Transaction<'c, Postgres>, topic: &Topic) -> RepoResult<()> {
            let done = sqlx::query("UPDATE topics SET status=$2, updated_at=$3 WHERE id=$1")
                .bind(topic.id).bind(topic.status).bind(topic.updated_at)
                .execute(&mut **tx).await.map_err(store_err)?;
            if done.rows_affected() == 0 {
                return Err(RepoError::NotFound("topic"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReplyRepo for PgRepo {
        async fn insert_reply(&self, reply: Reply, closing: Option<&Topic>) -> RepoResult<Reply> {
            let mut tx = self.pool.begin().await.map_err(store_err)?;
            let sql = format!(
                "INSERT INTO replies (message, created_at, updated_at, solution, deleted, author_id, topic_id) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7) RETURNING {REPLY_COLUMNS}"
            );
            let rec = sqlx::query_as::<_, Reply>(&sql)
                .bind(&reply.message).bind(reply.created_at).bind(reply.updated_at)
                .bind(reply.solution).bind(reply.deleted).bind(reply.author_id).bind(reply.topic_id)
                .fetch_one(&mut *tx).await.map_err(store_err)?;
            if let Some(topic) = closing {
                Self::close_topic(&mut tx, topic).await?;
            }
            tx.commit().await.map_err(store_err)?;
            Ok(rec)
        }

        async fn save_reply(&self, reply: &Reply, closing: Option<&Topic>) -> RepoResult<Reply> {
            let mut tx = self.pool.begin().await.map_err(store_err)?;
            let sql = format!(
                "UPDATE replies SET message=$2, updated_at=$3, solution=$4, deleted=$5 \
                 WHERE id=$1 RETURNING {REPLY_COLUMNS}"
            );
            let rec = sqlx::query_as::<_, Reply>(&sql)
                .bind(reply.id).bind(&reply.message).bind(reply.updated_at)
                .bind(reply.solution).bind(reply.deleted)
                .fetch_optional(&mut *tx).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("reply"))?;
            if let Some(topic) = closing {
                Self::close_topic(&mut tx, topic).await?;
            }
            tx.commit().await.map_err(store_err)?;
            Ok(rec)
        }

        async fn get_reply(&self, id: Id) -> RepoResult<Reply> {
            let sql = format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id=$1");
            sqlx::query_as::<_, Reply>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("reply"))
        }

        async fn reply_detail(&self, id: Id) -> RepoResult<ReplyDetail> {
            let sql = format!("{REPLY_DETAIL_SELECT} WHERE r.id = $1");
            sqlx::query_as::<_, ReplyDetail>(&sql)
                .bind(id)
                .fetch_optional(&self.pool).await.map_err(store_err)?
                .ok_or(RepoError::NotFound("reply"))
        }

        async fn list_replies(&self, filter: ReplyFilter, page: PageRequest) -> RepoResult<Page<ReplyDetail>> {
            let (include_deleted, topic_id, author_id) = match filter {
                ReplyFilter::All => (true, None, None),
                ReplyFilter::Active => (false, None, None),
                ReplyFilter::Topic(id) => (false, Some(id), None),
                ReplyFilter::Author(id) => (false, None, Some(id)),
            };
            const WHERE: &str = "($1 OR NOT r.deleted) \
                AND ($2::BIGINT IS NULL OR r.topic_id = $2) \
                AND ($3::BIGINT IS NULL OR r.author_id = $3)";
            let count_sql = format!("SELECT COUNT(*) FROM replies r WHERE {WHERE}");
            let total: i64 = sqlx::query_scalar(&count_sql)
                .bind(include_deleted).bind(topic_id).bind(author_id)
                .fetch_one(&self.pool).await.map_err(store_err)?;
            let (limit, offset) = limit_offset(page);
            let sql = format!("{REPLY_DETAIL_SELECT} WHERE {WHERE} ORDER BY r.updated_at ASC, r.id ASC LIMIT $4 OFFSET $5");
            let rows = sqlx::query_as::<_, ReplyDetail>(&sql)
                .bind(include_deleted).bind(topic_id).bind(author_id).bind(limit).bind(offset)
                .fetch_all(&self.pool).await.map_err(store_err)?;
            Ok(Page::new(rows, page, total as u64, reply_sort()))
        }

        async fn find_solution(&self, topic_id: Id) -> RepoResult<Option<Reply>> {
            let sql = format!("SELECT {REPLY_COLUMNS} FROM replies WHERE topic_id=$1 AND solution AND NOT deleted LIMIT 1");
            sqlx::query_as::<_, Reply>(&sql)
                .bind(topic_id)
                .fetch_optional(&self.pool).await.map_err(store_err)
        }
    }
}
