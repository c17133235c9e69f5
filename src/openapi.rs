use crate::error::ApiErrorBody;
use crate::models::{
    Category, CourseDetail, CoursePatch, NewCourse, NewReply, NewTopic, NewUser, ReplyDetail, ReplyPatch, Role,
    TopicDetail, TopicPatch, TopicStatus, UserDetail, UserPatch,
};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::create_user,
        crate::routes::list_users,
        crate::routes::list_all_users,
        crate::routes::get_user_by_username,
        crate::routes::get_user_by_id,
        crate::routes::update_user,
        crate::routes::delete_user,
        crate::routes::create_course,
        crate::routes::list_courses,
        crate::routes::list_all_courses,
        crate::routes::get_course,
        crate::routes::update_course,
        crate::routes::delete_course,
        crate::routes::create_topic,
        crate::routes::list_topics,
        crate::routes::list_all_topics,
        crate::routes::get_topic,
        crate::routes::get_topic_solution,
        crate::routes::update_topic,
        crate::routes::delete_topic,
        crate::routes::create_reply,
        crate::routes::list_replies,
        crate::routes::list_all_replies,
        crate::routes::list_topic_replies,
        crate::routes::list_user_replies,
        crate::routes::get_reply,
        crate::routes::update_reply,
        crate::routes::delete_reply,
    ),
    components(schemas(
        Role, Category, TopicStatus, ApiErrorBody,
        NewUser, UserPatch, UserDetail,
        NewCourse, CoursePatch, CourseDetail,
        NewTopic, TopicPatch, TopicDetail,
        NewReply, ReplyPatch, ReplyDetail,
    )),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "usuarios", description = "User accounts"),
        (name = "cursos", description = "Courses; mutations are admin only"),
        (name = "topicos", description = "Topics and their accepted solution"),
        (name = "respuestas", description = "Replies; marking one as solution closes its topic"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the global security requirement.
pub struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
        }
    }
}
