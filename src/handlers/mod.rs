pub mod auth_handler;
pub mod engagement_handler;
pub mod snippet_handler;

use actix_web::web::ReqData;

use crate::{error::AppError, models::UserData};

/// Mutating handlers call this to turn "no identity attached" into 401.
pub(crate) fn require_user(user: Option<ReqData<UserData>>) -> Result<UserData, AppError> {
    user.map(ReqData::into_inner).ok_or(AppError::Unauthenticated)
}
