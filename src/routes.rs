use std::sync::Arc;
use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;
use tracing::info;

use crate::auth::{hash_password, Auth};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::*;
use crate::paging::{PageParams, PageRequest};
use crate::repo::{ReplyFilter, Repo, Scope};
use crate::validation::Rules;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _req| ApiError::Validation(err.to_string()).into()));

    // fixed segments are registered ahead of the `{param}` resources they would otherwise shadow
    cfg.service(
        web::scope("/usuarios")
            .service(
                web::resource("")
                    .route(web::get().to(list_users))
                    .route(web::post().to(create_user)),
            )
            .service(web::resource("/all").route(web::get().to(list_all_users)))
            .service(web::resource("/username/{username}").route(web::get().to(get_user_by_username)))
            .service(web::resource("/id/{id}").route(web::get().to(get_user_by_id)))
            .service(
                web::resource("/{username}")
                    .route(web::put().to(update_user))
                    .route(web::delete().to(delete_user)),
            ),
    )
    .service(
        web::scope("/cursos")
            .service(
                web::resource("")
                    .route(web::get().to(list_courses))
                    .route(web::post().to(create_course)),
            )
            .service(web::resource("/all").route(web::get().to(list_all_courses)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_course))
                    .route(web::put().to(update_course))
                    .route(web::delete().to(delete_course)),
            ),
    )
    .service(
        web::scope("/topicos")
            .service(
                web::resource("")
                    .route(web::get().to(list_topics))
                    .route(web::post().to(create_topic)),
            )
            .service(web::resource("/all").route(web::get().to(list_all_topics)))
            .service(web::resource("/{id}/solucion").route(web::get().to(get_topic_solution)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_topic))
                    .route(web::put().to(update_topic))
                    .route(web::delete().to(delete_topic)),
            ),
    )
    .service(
        web::scope("/respuestas")
            .service(
                web::resource("")
                    .route(web::get().to(list_replies))
                    .route(web::post().to(create_reply)),
            )
            .service(web::resource("/all").route(web::get().to(list_all_replies)))
            .service(web::resource("/topico/{id}").route(web::get().to(list_topic_replies)))
            .service(web::resource("/usuario/{id}").route(web::get().to(list_user_replies)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_reply))
                    .route(web::put().to(update_reply))
                    .route(web::delete().to(delete_reply)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo>, pub rules: Arc<Rules> }

impl AppState {
    pub fn new(repo: Arc<dyn Repo>) -> Self {
        Self { repo, rules: Arc::new(Rules::standard()) }
    }
}

fn created(location: String, body: impl Serialize) -> HttpResponse {
    HttpResponse::Created().insert_header((header::LOCATION, location)).json(body)
}

async fn hash_blocking(plain: String) -> Result<String, ApiError> {
    web::block(move || hash_password(&plain)).await?
}

// ---------------------------------------------------------------- users

#[utoipa::path(
    post,
    path = "/usuarios",
    tag = "usuarios",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = UserDetail),
        (status = 400, description = "Missing field, bad email, or username/email taken", body = ApiErrorBody),
        (status = 403, description = "Only admins may assign a role"),
        (status = 409, description = "Username or email taken concurrently", body = ApiErrorBody)
    )
)]
pub async fn create_user(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewUser>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    if new.role.is_some_and(|r| r != Role::Student) {
        auth.require_admin()?;
    }
    data.rules.user_create.run(data.repo.as_ref(), None, &new).await?;
    let hash = hash_blocking(new.password.clone()).await?;
    let user = data.repo.insert_user(User::register(&new, hash)).await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(created(format!("/usuarios/username/{}", user.username), UserDetail::from(&user)))
}

#[utoipa::path(
    get,
    path = "/usuarios",
    tag = "usuarios",
    params(PageParams),
    responses((status = 200, description = "Page of enabled users"))
)]
pub async fn list_users(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_users(Scope::Active, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page.map(|u| UserDetail::from(&u))))
}

#[utoipa::path(
    get,
    path = "/usuarios/all",
    tag = "usuarios",
    params(PageParams),
    responses((status = 200, description = "Page of all users, disabled included"))
)]
pub async fn list_all_users(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_users(Scope::All, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page.map(|u| UserDetail::from(&u))))
}

async fn user_by_username(repo: &dyn Repo, username: &str) -> Result<User, ApiError> {
    repo.find_user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user '{username}' not found")))
}

#[utoipa::path(
    get,
    path = "/usuarios/username/{username}",
    tag = "usuarios",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = UserDetail),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn get_user_by_username(_auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let user = user_by_username(data.repo.as_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserDetail::from(&user)))
}

#[utoipa::path(
    get,
    path = "/usuarios/id/{id}",
    tag = "usuarios",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserDetail),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn get_user_by_id(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserDetail::from(&user)))
}

#[utoipa::path(
    put,
    path = "/usuarios/{username}",
    tag = "usuarios",
    request_body = UserPatch,
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User updated", body = UserDetail),
        (status = 400, description = "Bad email or username/email taken", body = ApiErrorBody),
        (status = 403, description = "Not this user, or role change by a non-admin"),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn update_user(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UserPatch>,
) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner();
    let patch = payload.into_inner();
    auth.require_self_or_admin(&username)?;
    if patch.role.is_some() {
        auth.require_admin()?;
    }
    let mut user = user_by_username(data.repo.as_ref(), &username).await?;
    data.rules.user_update.run(data.repo.as_ref(), Some(user.id), &patch).await?;
    let hash = match present(&patch.password) {
        Some(plain) => Some(hash_blocking(plain.to_string()).await?),
        None => None,
    };
    user.apply_update(&patch, hash);
    let user = data.repo.save_user(&user).await?;
    info!(user_id = user.id, "user updated");
    Ok(HttpResponse::Ok().json(UserDetail::from(&user)))
}

#[utoipa::path(
    delete,
    path = "/usuarios/{username}",
    tag = "usuarios",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "User disabled"),
        (status = 403, description = "Not this user and not an admin"),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn delete_user(auth: Auth, data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let username = path.into_inner();
    auth.require_self_or_admin(&username)?;
    let mut user = user_by_username(data.repo.as_ref(), &username).await?;
    user.soft_delete();
    data.repo.save_user(&user).await?;
    info!(user_id = user.id, "user disabled");
    Ok(HttpResponse::NoContent().finish())
}

// -------------------------------------------------------------- courses

#[utoipa::path(
    post,
    path = "/cursos",
    tag = "cursos",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Course created", body = CourseDetail),
        (status = 400, description = "Missing name or unknown category", body = ApiErrorBody),
        (status = 403, description = "Admins only")
    )
)]
pub async fn create_course(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewCourse>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let new = payload.into_inner();
    data.rules.course_create.run(data.repo.as_ref(), None, &new).await?;
    let course = data.repo.insert_course(Course::new(&new)).await?;
    info!(course_id = course.id, "course created");
    Ok(created(format!("/cursos/{}", course.id), CourseDetail::from(&course)))
}

#[utoipa::path(
    get,
    path = "/cursos",
    tag = "cursos",
    params(PageParams),
    responses((status = 200, description = "Page of active courses"))
)]
pub async fn list_courses(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_courses(Scope::Active, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page.map(|c| CourseDetail::from(&c))))
}

#[utoipa::path(
    get,
    path = "/cursos/all",
    tag = "cursos",
    params(PageParams),
    responses((status = 200, description = "Page of all courses, inactive included"))
)]
pub async fn list_all_courses(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_courses(Scope::All, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page.map(|c| CourseDetail::from(&c))))
}

#[utoipa::path(
    get,
    path = "/cursos/{id}",
    tag = "cursos",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseDetail),
        (status = 404, description = "Course not found", body = ApiErrorBody)
    )
)]
pub async fn get_course(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let course = data.repo.get_course(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CourseDetail::from(&course)))
}

#[utoipa::path(
    put,
    path = "/cursos/{id}",
    tag = "cursos",
    request_body = CoursePatch,
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course updated", body = CourseDetail),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Course not found", body = ApiErrorBody)
    )
)]
pub async fn update_course(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CoursePatch>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let mut course = data.repo.get_course(path.into_inner()).await?;
    course.apply_update(&payload);
    let course = data.repo.save_course(&course).await?;
    info!(course_id = course.id, "course updated");
    Ok(HttpResponse::Ok().json(CourseDetail::from(&course)))
}

#[utoipa::path(
    delete,
    path = "/cursos/{id}",
    tag = "cursos",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deactivated"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Course not found", body = ApiErrorBody)
    )
)]
pub async fn delete_course(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let mut course = data.repo.get_course(path.into_inner()).await?;
    course.soft_delete();
    data.repo.save_course(&course).await?;
    info!(course_id = course.id, "course deactivated");
    Ok(HttpResponse::NoContent().finish())
}

// --------------------------------------------------------------- topics

#[utoipa::path(
    post,
    path = "/topicos",
    tag = "topicos",
    request_body = NewTopic,
    responses(
        (status = 201, description = "Topic opened", body = TopicDetail),
        (status = 400, description = "Missing field or author disabled", body = ApiErrorBody),
        (status = 404, description = "Author or course not found", body = ApiErrorBody),
        (status = 409, description = "An open topic with this title and message exists", body = ApiErrorBody)
    )
)]
pub async fn create_topic(
    _auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewTopic>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    data.rules.topic_create.run(data.repo.as_ref(), None, &new).await?;
    data.repo.get_course(new.course_id).await?;
    let topic = data.repo.insert_topic(Topic::open(&new)).await?;
    info!(topic_id = topic.id, author_id = topic.author_id, course_id = topic.course_id, "topic opened");
    let detail = data.repo.topic_detail(topic.id).await?;
    Ok(created(format!("/topicos/{}", topic.id), detail))
}

#[utoipa::path(
    get,
    path = "/topicos",
    tag = "topicos",
    params(PageParams),
    responses((status = 200, description = "Page of non-deleted topics, latest activity first"))
)]
pub async fn list_topics(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_topics(Scope::Active, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/topicos/all",
    tag = "topicos",
    params(PageParams),
    responses((status = 200, description = "Page of all topics, deleted included"))
)]
pub async fn list_all_topics(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_topics(Scope::All, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/topicos/{id}",
    tag = "topicos",
    params(("id" = i64, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic", body = TopicDetail),
        (status = 404, description = "Topic not found", body = ApiErrorBody)
    )
)]
pub async fn get_topic(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let detail = data.repo.topic_detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    get,
    path = "/topicos/{id}/solucion",
    tag = "topicos",
    params(("id" = i64, Path, description = "Topic id")),
    responses(
        (status = 200, description = "The accepted reply of the topic", body = ReplyDetail),
        (status = 404, description = "Topic not found or not solved yet", body = ApiErrorBody)
    )
)]
pub async fn get_topic_solution(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let topic = data.repo.get_topic(path.into_inner()).await?;
    let solution = data.repo.find_solution(topic.id).await?
        .ok_or_else(|| ApiError::NotFound(format!("topic {} has no accepted solution", topic.id)))?;
    let detail = data.repo.reply_detail(solution.id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[utoipa::path(
    put,
    path = "/topicos/{id}",
    tag = "topicos",
    request_body = TopicPatch,
    params(("id" = i64, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Topic updated", body = TopicDetail),
        (status = 400, description = "Attempt to reopen a closed topic", body = ApiErrorBody),
        (status = 404, description = "Topic or course not found", body = ApiErrorBody),
        (status = 409, description = "An open topic with this title and message exists", body = ApiErrorBody)
    )
)]
pub async fn update_topic(
    _auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<TopicPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let patch = payload.into_inner();
    data.rules.topic_update.run(data.repo.as_ref(), Some(id), &patch).await?;
    let mut topic = data.repo.get_topic(id).await?;
    if let Some(course_id) = patch.course_id {
        data.repo.get_course(course_id).await?;
    }
    topic.apply_update(&patch);
    data.repo.save_topic(&topic).await?;
    info!(topic_id = id, status = ?topic.status, "topic updated");
    Ok(HttpResponse::Ok().json(data.repo.topic_detail(id).await?))
}

#[utoipa::path(
    delete,
    path = "/topicos/{id}",
    tag = "topicos",
    params(("id" = i64, Path, description = "Topic id")),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 404, description = "Topic not found", body = ApiErrorBody)
    )
)]
pub async fn delete_topic(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let mut topic = data.repo.get_topic(path.into_inner()).await?;
    topic.soft_delete();
    data.repo.save_topic(&topic).await?;
    info!(topic_id = topic.id, "topic deleted");
    Ok(HttpResponse::NoContent().finish())
}

// -------------------------------------------------------------- replies

#[utoipa::path(
    post,
    path = "/respuestas",
    tag = "respuestas",
    request_body = NewReply,
    responses(
        (status = 201, description = "Reply posted; with solution=true the topic is closed", body = ReplyDetail),
        (status = 400, description = "Missing message, topic closed or deleted, or author disabled", body = ApiErrorBody),
        (status = 404, description = "Topic or author not found", body = ApiErrorBody),
        (status = 409, description = "Topic already has an accepted solution", body = ApiErrorBody)
    )
)]
pub async fn create_reply(
    _auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewReply>,
) -> Result<HttpResponse, ApiError> {
    let new = payload.into_inner();
    data.rules.reply_create.run(data.repo.as_ref(), None, &new).await?;
    let mut reply = Reply::post(&new);
    let reply = if new.solution {
        let mut topic = data.repo.get_topic(new.topic_id).await?;
        reply.mark_as_solution(&mut topic);
        data.repo.insert_reply(reply, Some(&topic)).await?
    } else {
        data.repo.insert_reply(reply, None).await?
    };
    info!(reply_id = reply.id, topic_id = reply.topic_id, solution = reply.solution, "reply posted");
    let detail = data.repo.reply_detail(reply.id).await?;
    Ok(created(format!("/respuestas/{}", reply.id), detail))
}

#[utoipa::path(
    get,
    path = "/respuestas",
    tag = "respuestas",
    params(PageParams),
    responses((status = 200, description = "Page of non-deleted replies, oldest activity first"))
)]
pub async fn list_replies(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_replies(ReplyFilter::Active, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/respuestas/all",
    tag = "respuestas",
    params(PageParams),
    responses((status = 200, description = "Page of all replies, deleted included"))
)]
pub async fn list_all_replies(_auth: Auth, data: web::Data<AppState>, query: web::Query<PageParams>) -> Result<HttpResponse, ApiError> {
    let page = data.repo.list_replies(ReplyFilter::All, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/respuestas/topico/{id}",
    tag = "respuestas",
    params(("id" = i64, Path, description = "Topic id"), PageParams),
    responses(
        (status = 200, description = "Page of non-deleted replies of the topic"),
        (status = 404, description = "Topic not found", body = ApiErrorBody)
    )
)]
pub async fn list_topic_replies(
    _auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let topic = data.repo.get_topic(path.into_inner()).await?;
    let page: PageRequest = query.into_inner().into();
    Ok(HttpResponse::Ok().json(data.repo.list_replies(ReplyFilter::Topic(topic.id), page).await?))
}

#[utoipa::path(
    get,
    path = "/respuestas/usuario/{id}",
    tag = "respuestas",
    params(("id" = i64, Path, description = "Author id"), PageParams),
    responses(
        (status = 200, description = "Page of non-deleted replies by the user"),
        (status = 404, description = "User not found", body = ApiErrorBody)
    )
)]
pub async fn list_user_replies(
    _auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let author = data.repo.get_user(path.into_inner()).await?;
    let page: PageRequest = query.into_inner().into();
    Ok(HttpResponse::Ok().json(data.repo.list_replies(ReplyFilter::Author(author.id), page).await?))
}

#[utoipa::path(
    get,
    path = "/respuestas/{id}",
    tag = "respuestas",
    params(("id" = i64, Path, description = "Reply id")),
    responses(
        (status = 200, description = "Reply", body = ReplyDetail),
        (status = 404, description = "Reply not found", body = ApiErrorBody)
    )
)]
pub async fn get_reply(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.repo.reply_detail(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/respuestas/{id}",
    tag = "respuestas",
    request_body = ReplyPatch,
    params(("id" = i64, Path, description = "Reply id")),
    responses(
        (status = 200, description = "Reply updated; with solution=true the topic is closed", body = ReplyDetail),
        (status = 400, description = "Withdrawing an accepted solution, or topic already solved", body = ApiErrorBody),
        (status = 404, description = "Reply not found", body = ApiErrorBody),
        (status = 409, description = "Topic solved concurrently", body = ApiErrorBody)
    )
)]
pub async fn update_reply(
    _auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<ReplyPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let patch = payload.into_inner();
    data.rules.reply_update.run(data.repo.as_ref(), Some(id), &patch).await?;
    let mut reply = data.repo.get_reply(id).await?;
    reply.apply_update(&patch);
    if patch.solution == Some(true) && !reply.solution {
        let mut topic = data.repo.get_topic(reply.topic_id).await?;
        reply.mark_as_solution(&mut topic);
        data.repo.save_reply(&reply, Some(&topic)).await?;
        info!(reply_id = id, topic_id = topic.id, "reply accepted, topic closed");
    } else {
        data.repo.save_reply(&reply, None).await?;
        info!(reply_id = id, "reply updated");
    }
    Ok(HttpResponse::Ok().json(data.repo.reply_detail(id).await?))
}

#[utoipa::path(
    delete,
    path = "/respuestas/{id}",
    tag = "respuestas",
    params(("id" = i64, Path, description = "Reply id")),
    responses(
        (status = 204, description = "Reply deleted"),
        (status = 404, description = "Reply not found", body = ApiErrorBody)
    )
)]
pub async fn delete_reply(_auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let mut reply = data.repo.get_reply(path.into_inner()).await?;
    reply.soft_delete();
    data.repo.save_reply(&reply, None).await?;
    info!(reply_id = reply.id, "reply deleted");
    Ok(HttpResponse::NoContent().finish())
}
