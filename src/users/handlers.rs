use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    extract::{BaseUrl, Format, JsonOrForm},
    include_res,
    res::{escape, human_time},
    AppError, AppResult,
};

use super::{UserRepository, UserView};

#[derive(Debug, Deserialize)]
pub(crate) struct UserFields {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NewUserBody {
    Nested { user: UserFields },
    Flat(UserFields),
}

fn users_page(users: &[UserView]) -> Html<String> {
    let mut user_items = String::new();
    for user in users {
        user_items += &include_res!(str, "/pages/users/user_item.html")
            .replace("{id}", &escape(&user.id))
            .replace("{created}", &human_time(user.created))
            .replace("{name}", &escape(&user.name));
    }
    Html(include_res!(str, "/pages/users/users.html").replace("{user_items}", &user_items))
}

fn user_page(user: &UserView) -> Html<String> {
    Html(
        include_res!(str, "/pages/users/user.html")
            .replace("{created}", &human_time(user.created))
            .replace("{name}", &escape(&user.name)),
    )
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(users): State<UserRepository>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let views: Vec<UserView> = users
        .list_users()
        .await?
        .into_iter()
        .map(|user| user.into_view(&base))
        .collect();

    Ok(match format {
        Format::Json => Json(views).into_response(),
        Format::Html => users_page(&views).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create(
    State(users): State<UserRepository>,
    format: Format,
    base: BaseUrl,
    JsonOrForm(body): JsonOrForm<NewUserBody>,
) -> AppResult<Response> {
    let (NewUserBody::Nested { user: fields } | NewUserBody::Flat(fields)) = body;
    let name = fields.name.ok_or_else(|| AppError::bad_request("user name is required"))?;
    let user = users.create_user(&name).await?;

    Ok(match format {
        Format::Json => (StatusCode::CREATED, Json(user.into_view(&base))).into_response(),
        Format::Html => Redirect::to(&user.path()).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get(
    State(users): State<UserRepository>,
    Path(user_id): Path<String>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let view = users.get_user(&user_id).await?.into_view(&base);

    Ok(match format {
        Format::Json => Json(view).into_response(),
        Format::Html => user_page(&view).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete(
    State(users): State<UserRepository>,
    Path(user_id): Path<String>,
    format: Format,
) -> AppResult<Response> {
    users.delete_user(&user_id).await?;

    Ok(match format {
        Format::Json => Json(json!({})).into_response(),
        Format::Html => Redirect::to("/users").into_response(),
    })
}
