use actix_web::web;

use crate::{
    handlers::{engagement_handler, snippet_handler},
    middleware::jwt_middleware::ExtractIdentity,
};

pub fn config(config: &mut web::ServiceConfig, identity: ExtractIdentity) {
    config
        .service(
            web::scope("/snippets")
                .service(snippet_handler::get_page_snippets)
                .service(snippet_handler::create_snippet)
                .service(engagement_handler::check_like)
                .service(engagement_handler::like_snippet)
                .service(engagement_handler::unlike_snippet)
                .service(engagement_handler::list_comments)
                .service(engagement_handler::add_comment)
                .service(engagement_handler::remove_comment)
                .service(snippet_handler::get_snippet)
                .service(snippet_handler::update_snippet)
                .service(snippet_handler::delete_snippet)
                .wrap(identity.clone()),
        )
        .service(
            web::scope("/profile")
                .service(snippet_handler::get_user_snippets)
                .wrap(identity),
        );
}
