#![cfg(feature = "inmem-store")]

use forohub::{
    models::*,
    paging::PageRequest,
    repo::{inmem::InMemRepo, ReplyFilter, RepoError, Scope},
};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use forohub::repo::{CourseRepo, ReplyRepo, TopicRepo, UserRepo};

fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.into(),
        email: format!("{name}@forohub.dev"),
        password: "pw".into(),
        first_name: "First".into(),
        last_name: "Last".into(),
        role: None,
    }
}

async fn user(r: &InMemRepo, name: &str) -> User {
    r.insert_user(User::register(&new_user(name), "hash".into())).await.unwrap()
}

async fn course(r: &InMemRepo) -> Course {
    r.insert_course(Course::new(&NewCourse { name: "Rust".into(), category: Category::Backend }))
        .await
        .unwrap()
}

async fn topic(r: &InMemRepo, author: &User, course: &Course, title: &str) -> Topic {
    let new = NewTopic { title: title.into(), message: "body".into(), author_id: author.id, course_id: course.id };
    r.insert_topic(Topic::open(&new)).await.unwrap()
}

fn reply_to(t: &Topic, author: &User, message: &str) -> Reply {
    Reply::post(&NewReply { message: message.into(), author_id: author.id, topic_id: t.id, solution: false })
}

#[tokio::test]
async fn usernames_and_emails_are_unique() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    assert_eq!(ana.id, 1);

    let err = r.insert_user(User::register(&new_user("ana"), "h".into())).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    // email comparison ignores case
    let mut other = new_user("bob");
    other.email = "ANA@forohub.dev".into();
    let err = r.insert_user(User::register(&other, "h".into())).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    // a rejected insert does not consume an id
    let bob = user(&r, "bob").await;
    assert_eq!(bob.id, 2);

    let mut renamed = bob.clone();
    renamed.username = "ana".into();
    assert!(matches!(r.save_user(&renamed).await, Err(RepoError::Conflict(_))));
}

#[tokio::test]
async fn disabled_users_only_in_full_listing() {
    let r = InMemRepo::new();
    user(&r, "ana").await;
    let mut bob = user(&r, "bob").await;
    bob.soft_delete();
    r.save_user(&bob).await.unwrap();

    let active = r.list_users(Scope::Active, PageRequest::default()).await.unwrap();
    assert_eq!(active.total_elements, 1);
    let all = r.list_users(Scope::All, PageRequest::default()).await.unwrap();
    assert_eq!(all.total_elements, 2);
    assert_eq!(all.content.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(r.find_user_by_email("bob@forohub.dev").await.unwrap().is_some());
}

#[tokio::test]
async fn topic_insert_checks_references() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let c = course(&r).await;

    let orphan = NewTopic { title: "t".into(), message: "m".into(), author_id: 99, course_id: c.id };
    assert!(matches!(r.insert_topic(Topic::open(&orphan)).await, Err(RepoError::NotFound("user"))));
    let orphan = NewTopic { title: "t".into(), message: "m".into(), author_id: ana.id, course_id: 99 };
    assert!(matches!(r.insert_topic(Topic::open(&orphan)).await, Err(RepoError::NotFound("course"))));

    let t = topic(&r, &ana, &c, "t").await;
    let detail = r.topic_detail(t.id).await.unwrap();
    assert_eq!(detail.author, "ana");
    assert_eq!(detail.course, "Rust");
    assert_eq!(detail.category, Category::Backend);
}

#[tokio::test]
async fn topics_page_latest_first() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let c = course(&r).await;
    for i in 1..=7 {
        topic(&r, &ana, &c, &format!("topic {i}")).await;
    }
    let mut gone = r.get_topic(3).await.unwrap();
    gone.soft_delete();
    r.save_topic(&gone).await.unwrap();

    let first = r.list_topics(Scope::Active, PageRequest::default()).await.unwrap();
    assert_eq!(first.content.len(), 5);
    assert_eq!(first.total_elements, 6);
    assert_eq!(first.total_pages, 2);
    // the deleted topic was touched last, but is hidden
    assert_eq!(first.content[0].id, 7);

    let all = r.list_topics(Scope::All, PageRequest::new(0, 10)).await.unwrap();
    assert_eq!(all.total_elements, 7);
    assert_eq!(all.content[0].id, 3);
}

#[tokio::test]
async fn open_topic_lookup_skips_closed_deleted_and_self() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let c = course(&r).await;
    let mut t = topic(&r, &ana, &c, "same").await;

    assert_eq!(r.find_open_topic("same", "body", None).await.unwrap().map(|t| t.id), Some(t.id));
    assert!(r.find_open_topic("same", "body", Some(t.id)).await.unwrap().is_none());

    t.close();
    r.save_topic(&t).await.unwrap();
    assert!(r.find_open_topic("same", "body", None).await.unwrap().is_none());
}

#[tokio::test]
async fn accepted_reply_and_topic_close_are_written_together() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let bob = user(&r, "bob").await;
    let c = course(&r).await;
    let t = topic(&r, &ana, &c, "help").await;

    let plain = r.insert_reply(reply_to(&t, &bob, "first"), None).await.unwrap();
    assert!(!r.get_topic(t.id).await.unwrap().is_closed());

    let mut answer = reply_to(&t, &bob, "answer");
    let mut parent = r.get_topic(t.id).await.unwrap();
    answer.mark_as_solution(&mut parent);
    let answer = r.insert_reply(answer, Some(&parent)).await.unwrap();

    assert!(r.get_topic(t.id).await.unwrap().is_closed());
    assert_eq!(r.find_solution(t.id).await.unwrap().map(|s| s.id), Some(answer.id));

    // a second accepted reply is refused and nothing changes
    let mut second = plain.clone();
    second.solution = true;
    assert!(matches!(r.save_reply(&second, None).await, Err(RepoError::Conflict(_))));
    assert!(!r.get_reply(plain.id).await.unwrap().solution);
}

#[tokio::test]
async fn closing_keeps_concurrent_topic_edits() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let c = course(&r).await;
    let t = topic(&r, &ana, &c, "help").await;
    let plain = r.insert_reply(reply_to(&t, &ana, "answer"), None).await.unwrap();

    // the handler's copy of the topic is loaded before another request edits it
    let mut parent = r.get_topic(t.id).await.unwrap();
    let mut edited = r.get_topic(t.id).await.unwrap();
    edited.apply_update(&TopicPatch { title: Some("renamed".into()), ..Default::default() });
    edited.soft_delete();
    r.save_topic(&edited).await.unwrap();

    let mut accepted = plain.clone();
    accepted.mark_as_solution(&mut parent);
    r.save_reply(&accepted, Some(&parent)).await.unwrap();

    let stored = r.get_topic(t.id).await.unwrap();
    assert!(stored.is_closed());
    assert!(stored.deleted);
    assert_eq!(stored.title, "renamed");
}

#[tokio::test]
async fn closing_a_missing_topic_writes_nothing() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let c = course(&r).await;
    let t = topic(&r, &ana, &c, "help").await;

    let mut ghost = t.clone();
    ghost.id = 42;
    let mut answer = reply_to(&t, &ana, "answer");
    answer.mark_as_solution(&mut ghost);
    assert!(matches!(r.insert_reply(answer, Some(&ghost)).await, Err(RepoError::NotFound("topic"))));
    assert_eq!(r.list_replies(ReplyFilter::All, PageRequest::default()).await.unwrap().total_elements, 0);
}

#[tokio::test]
async fn reply_filters_hide_deleted() {
    let r = InMemRepo::new();
    let ana = user(&r, "ana").await;
    let bob = user(&r, "bob").await;
    let c = course(&r).await;
    let t1 = topic(&r, &ana, &c, "one").await;
    let t2 = topic(&r, &ana, &c, "two").await;

    r.insert_reply(reply_to(&t1, &bob, "a"), None).await.unwrap();
    let mut b = r.insert_reply(reply_to(&t1, &ana, "b"), None).await.unwrap();
    r.insert_reply(reply_to(&t2, &bob, "c"), None).await.unwrap();
    b.soft_delete();
    r.save_reply(&b, None).await.unwrap();

    let page = PageRequest::default();
    assert_eq!(r.list_replies(ReplyFilter::All, page).await.unwrap().total_elements, 3);
    assert_eq!(r.list_replies(ReplyFilter::Active, page).await.unwrap().total_elements, 2);
    assert_eq!(r.list_replies(ReplyFilter::Topic(t1.id), page).await.unwrap().total_elements, 1);
    assert_eq!(r.list_replies(ReplyFilter::Author(ana.id), page).await.unwrap().total_elements, 0);

    let by_bob = r.list_replies(ReplyFilter::Author(bob.id), page).await.unwrap();
    assert_eq!(by_bob.content.iter().map(|d| d.message.as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
    assert_eq!(by_bob.content[1].topic_title, "two");
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let r = InMemRepo::with_snapshot(dir.path());
        let ana = user(&r, "ana").await;
        let c = course(&r).await;
        topic(&r, &ana, &c, "persisted").await;
    }
    assert!(dir.path().join("state.json").exists());
    // the temporary file is renamed into place, never left behind
    assert!(!dir.path().join("state.json.tmp").exists());

    let r = InMemRepo::with_snapshot(dir.path());
    assert!(r.find_user_by_username("ana").await.unwrap().is_some());
    assert_eq!(r.get_topic(1).await.unwrap().title, "persisted");
    // id sequences continue where they stopped
    assert_eq!(user(&r, "bob").await.id, 2);
}

#[tokio::test]
async fn unreadable_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("state.json"), b"not json").unwrap();
    let r = InMemRepo::with_snapshot(dir.path());
    assert_eq!(r.list_users(Scope::All, PageRequest::default()).await.unwrap().total_elements, 0);
}

#[tokio::test]
async fn unwritable_snapshot_fails_the_write() {
    let dir = tempfile::tempdir().unwrap();
    // a directory where the snapshot file should go makes the rename fail
    std::fs::create_dir(dir.path().join("state.json")).unwrap();
    let r = InMemRepo::with_snapshot(dir.path());
    let err = r.insert_user(User::register(&new_user("ana"), "h".into())).await.unwrap_err();
    assert!(matches!(err, RepoError::Internal(_)));
}
