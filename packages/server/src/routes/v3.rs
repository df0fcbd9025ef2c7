use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{activity, auth, eev, model, source, tag, tagset};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(source_routes())
        .merge(tag_routes())
        .merge(tagset_routes())
        .merge(activity_routes())
        .merge(model_routes())
        .routes(routes!(eev::eev_login))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::login))
        .routes(routes!(auth::logout))
        .routes(routes!(auth::me))
}

fn source_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(source::list_sources, source::create_source))
        .routes(routes!(
            source::get_source,
            source::update_source,
            source::delete_source
        ))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(tag::list_tags))
        .routes(routes!(tag::get_tag, tag::put_tag, tag::delete_tag))
        .routes(routes!(tag::list_tag_activities))
}

fn tagset_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(tagset::list_tagsets, tagset::create_tagset))
        .routes(routes!(
            tagset::get_tagset,
            tagset::update_tagset,
            tagset::delete_tagset
        ))
        .routes(routes!(tagset::add_tagset_tag, tagset::remove_tagset_tag))
        .routes(routes!(tagset::list_tagset_activities))
}

fn activity_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            activity::list_activities,
            activity::import_activities
        ))
        .routes(routes!(
            activity::get_activity,
            activity::put_activity,
            activity::delete_activity
        ))
        .routes(routes!(activity::get_activity_field))
        .routes(routes!(
            activity::get_activity_tags,
            activity::patch_activity_tags
        ))
        .routes(routes!(activity::suggest_activity_tags))
}

fn model_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(model::search_model))
        .routes(routes!(model::train_model))
        .routes(routes!(model::suggest_for_text))
        .routes(routes!(model::list_jobs))
        .routes(routes!(model::get_job, model::delete_job))
        .routes(routes!(model::get_model))
}
