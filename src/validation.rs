//! Business-rule chains run before a create or update touches the store.
//!
//! Each [`Rule`] checks one thing. A [`Chain`] runs its rules in the order they
//! were added and stops at the first failure, so a rejected request never
//! reaches a write. [`Rules`] is the registry of chains per entity and operation.

use async_trait::async_trait;
use email_address::EmailAddress;
use tracing::debug;

use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

pub type RuleResult = Result<(), ApiError>;

#[async_trait]
pub trait Rule<T: Sync>: Send + Sync {
    fn name(&self) -> &'static str;

    /// `target` is the id of the entity being updated, `None` on create.
    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &T) -> RuleResult;
}

pub struct Chain<T: Sync + 'static> {
    rules: Vec<Box<dyn Rule<T>>>,
}

impl<T: Sync + 'static> Chain<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with(mut self, rule: impl Rule<T> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub async fn run(&self, repo: &dyn Repo, target: Option<Id>, input: &T) -> RuleResult {
        for rule in &self.rules {
            if let Err(e) = rule.check(repo, target, input).await {
                debug!(rule = rule.name(), error = %e, "validation rejected request");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<T: Sync + 'static> Default for Chain<T> {
    fn default() -> Self { Self::new() }
}

/// All chains used by the request handlers.
pub struct Rules {
    pub user_create: Chain<NewUser>,
    pub user_update: Chain<UserPatch>,
    pub course_create: Chain<NewCourse>,
    pub topic_create: Chain<NewTopic>,
    pub topic_update: Chain<TopicPatch>,
    pub reply_create: Chain<NewReply>,
    pub reply_update: Chain<ReplyPatch>,
}

impl Rules {
    pub fn standard() -> Self {
        Self {
            user_create: Chain::new()
                .with(FieldsPresent)
                .with(WellFormedEmail)
                .with(UniqueUsername)
                .with(UniqueEmail),
            user_update: Chain::new()
                .with(WellFormedEmail)
                .with(UniqueUsername)
                .with(UniqueEmail),
            course_create: Chain::new().with(FieldsPresent),
            topic_create: Chain::new()
                .with(FieldsPresent)
                .with(AuthorEnabled)
                .with(UniqueOpenTopic),
            topic_update: Chain::new()
                .with(NoReopen)
                .with(UniqueOpenTopic),
            reply_create: Chain::new()
                .with(FieldsPresent)
                .with(TopicAcceptsReplies)
                .with(AuthorEnabled),
            reply_update: Chain::new()
                .with(SolutionNotWithdrawn)
                .with(SolutionOnLiveReply)
                .with(SingleSolution),
        }
    }
}

impl Default for Rules {
    fn default() -> Self { Self::standard() }
}

// ------------------------------------------------------- field presence

pub trait RequiredFields {
    fn missing_fields(&self) -> Vec<&'static str>;
}

fn missing(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields.iter().filter(|(_, v)| v.trim().is_empty()).map(|(name, _)| *name).collect()
}

impl RequiredFields for NewUser {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ])
    }
}

impl RequiredFields for NewCourse {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[("name", &self.name)])
    }
}

impl RequiredFields for NewTopic {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[("title", &self.title), ("message", &self.message)])
    }
}

impl RequiredFields for NewReply {
    fn missing_fields(&self) -> Vec<&'static str> {
        missing(&[("message", &self.message)])
    }
}

pub struct FieldsPresent;

#[async_trait]
impl<T: RequiredFields + Sync> Rule<T> for FieldsPresent {
    fn name(&self) -> &'static str { "fields_present" }

    async fn check(&self, _repo: &dyn Repo, _target: Option<Id>, input: &T) -> RuleResult {
        let absent = input.missing_fields();
        if absent.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(format!("missing required fields: {}", absent.join(", "))))
        }
    }
}

// ---------------------------------------------------------------- users

/// Username/email carried by a create or update request, when it carries one.
pub trait AccountKeys {
    fn username(&self) -> Option<&str>;
    fn email(&self) -> Option<&str>;
}

impl AccountKeys for NewUser {
    fn username(&self) -> Option<&str> { Some(self.username.trim()).filter(|s| !s.is_empty()) }
    fn email(&self) -> Option<&str> { Some(self.email.trim()).filter(|s| !s.is_empty()) }
}

impl AccountKeys for UserPatch {
    fn username(&self) -> Option<&str> { present(&self.username).map(str::trim) }
    fn email(&self) -> Option<&str> { present(&self.email).map(str::trim) }
}

/// RFC 5322 syntax, plus a dotted domain: `ana@localhost` is not a forum address.
pub fn is_well_formed_email(email: &str) -> bool {
    EmailAddress::is_valid(email)
        && email.rsplit_once('@').is_some_and(|(_, domain)| domain.contains('.'))
}

pub struct WellFormedEmail;

#[async_trait]
impl<T: AccountKeys + Sync> Rule<T> for WellFormedEmail {
    fn name(&self) -> &'static str { "well_formed_email" }

    async fn check(&self, _repo: &dyn Repo, _target: Option<Id>, input: &T) -> RuleResult {
        match input.email() {
            Some(email) if !is_well_formed_email(email) => {
                Err(ApiError::Validation(format!("'{email}' is not a valid email address")))
            }
            _ => Ok(()),
        }
    }
}

/// On update, a match on the user being updated (`target`) is not a collision.
pub struct UniqueUsername;

#[async_trait]
impl<T: AccountKeys + Sync> Rule<T> for UniqueUsername {
    fn name(&self) -> &'static str { "unique_username" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &T) -> RuleResult {
        let Some(username) = input.username() else { return Ok(()) };
        match repo.find_user_by_username(username).await? {
            Some(existing) if Some(existing.id) != target => {
                Err(ApiError::Validation(format!("username '{username}' is already taken")))
            }
            _ => Ok(()),
        }
    }
}

pub struct UniqueEmail;

#[async_trait]
impl<T: AccountKeys + Sync> Rule<T> for UniqueEmail {
    fn name(&self) -> &'static str { "unique_email" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &T) -> RuleResult {
        let Some(email) = input.email() else { return Ok(()) };
        match repo.find_user_by_email(email).await? {
            Some(existing) if Some(existing.id) != target => {
                Err(ApiError::Validation(format!("email '{email}' is already registered")))
            }
            _ => Ok(()),
        }
    }
}

// ------------------------------------------------------ topics, replies

pub trait Authored {
    fn author_id(&self) -> Id;
}

impl Authored for NewTopic {
    fn author_id(&self) -> Id { self.author_id }
}

impl Authored for NewReply {
    fn author_id(&self) -> Id { self.author_id }
}

pub struct AuthorEnabled;

#[async_trait]
impl<T: Authored + Sync> Rule<T> for AuthorEnabled {
    fn name(&self) -> &'static str { "author_enabled" }

    async fn check(&self, repo: &dyn Repo, _target: Option<Id>, input: &T) -> RuleResult {
        let author = repo.get_user(input.author_id()).await?;
        if author.enabled {
            Ok(())
        } else {
            Err(ApiError::Validation(format!("user '{}' is disabled and cannot post", author.username)))
        }
    }
}

/// Duplicate-topic guard: no two live OPEN topics share title and message.
pub struct UniqueOpenTopic;

fn duplicate_topic(existing: &Topic) -> ApiError {
    ApiError::Conflict(format!("topic {} already has the same title and message", existing.id))
}

#[async_trait]
impl Rule<NewTopic> for UniqueOpenTopic {
    fn name(&self) -> &'static str { "unique_open_topic" }

    async fn check(&self, repo: &dyn Repo, _target: Option<Id>, input: &NewTopic) -> RuleResult {
        match repo.find_open_topic(input.title.trim(), input.message.trim(), None).await? {
            Some(existing) => Err(duplicate_topic(&existing)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Rule<TopicPatch> for UniqueOpenTopic {
    fn name(&self) -> &'static str { "unique_open_topic" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &TopicPatch) -> RuleResult {
        let (Some(id), true) = (target, present(&input.title).is_some() || present(&input.message).is_some()) else {
            return Ok(());
        };
        let current = repo.get_topic(id).await?;
        let title = present(&input.title).map(str::trim).unwrap_or(current.title.as_str());
        let message = present(&input.message).map(str::trim).unwrap_or(current.message.as_str());
        match repo.find_open_topic(title, message, Some(id)).await? {
            Some(existing) => Err(duplicate_topic(&existing)),
            None => Ok(()),
        }
    }
}

/// Closing is terminal: a CLOSED topic cannot be patched back to OPEN.
pub struct NoReopen;

#[async_trait]
impl Rule<TopicPatch> for NoReopen {
    fn name(&self) -> &'static str { "no_reopen" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &TopicPatch) -> RuleResult {
        let (Some(id), Some(TopicStatus::Open)) = (target, input.status) else { return Ok(()) };
        if repo.get_topic(id).await?.is_closed() {
            Err(ApiError::Validation(format!("topic {id} is closed and cannot be reopened")))
        } else {
            Ok(())
        }
    }
}

pub struct TopicAcceptsReplies;

#[async_trait]
impl Rule<NewReply> for TopicAcceptsReplies {
    fn name(&self) -> &'static str { "topic_accepts_replies" }

    async fn check(&self, repo: &dyn Repo, _target: Option<Id>, input: &NewReply) -> RuleResult {
        let topic = repo.get_topic(input.topic_id).await?;
        if topic.deleted {
            return Err(ApiError::Validation(format!("topic {} has been deleted", topic.id)));
        }
        if topic.is_closed() {
            return Err(ApiError::Validation(format!("topic {} is closed", topic.id)));
        }
        Ok(())
    }
}

pub struct SolutionNotWithdrawn;

#[async_trait]
impl Rule<ReplyPatch> for SolutionNotWithdrawn {
    fn name(&self) -> &'static str { "solution_not_withdrawn" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &ReplyPatch) -> RuleResult {
        let (Some(id), Some(false)) = (target, input.solution) else { return Ok(()) };
        if repo.get_reply(id).await?.solution {
            Err(ApiError::Validation(format!("reply {id} is the accepted solution and cannot be withdrawn")))
        } else {
            Ok(())
        }
    }
}

/// A deleted reply cannot become the answer that closes its topic.
pub struct SolutionOnLiveReply;

#[async_trait]
impl Rule<ReplyPatch> for SolutionOnLiveReply {
    fn name(&self) -> &'static str { "solution_on_live_reply" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &ReplyPatch) -> RuleResult {
        let (Some(id), Some(true)) = (target, input.solution) else { return Ok(()) };
        if repo.get_reply(id).await?.deleted {
            Err(ApiError::Validation(format!("reply {id} has been deleted and cannot be accepted")))
        } else {
            Ok(())
        }
    }
}

/// At most one live accepted reply per topic.
pub struct SingleSolution;

#[async_trait]
impl Rule<ReplyPatch> for SingleSolution {
    fn name(&self) -> &'static str { "single_solution" }

    async fn check(&self, repo: &dyn Repo, target: Option<Id>, input: &ReplyPatch) -> RuleResult {
        let (Some(id), Some(true)) = (target, input.solution) else { return Ok(()) };
        let reply = repo.get_reply(id).await?;
        match repo.find_solution(reply.topic_id).await? {
            Some(existing) if existing.id != reply.id => Err(ApiError::Validation(format!(
                "topic {} already has an accepted solution (reply {})",
                reply.topic_id, existing.id
            ))),
            _ => Ok(()),
        }
    }
}
