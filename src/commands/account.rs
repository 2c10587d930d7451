//! 账户命令

use tracing::info;

use super::CommandResult;
use crate::models::User;
use crate::AppState;

pub use crate::account::RegisterForm;

pub async fn register(state: &AppState, form: RegisterForm) -> CommandResult<User> {
    Ok(state.community_domain.get_accounts().register(form).await?)
}

pub async fn login(state: &AppState, username: &str, password: &str) -> CommandResult<User> {
    Ok(state
        .community_domain
        .get_accounts()
        .login(username, password)
        .await?)
}

pub async fn logout(state: &AppState) -> CommandResult<()> {
    state.community_domain.get_accounts().logout().await?;
    info!("用户已登出");
    Ok(())
}

pub async fn current_user(state: &AppState) -> CommandResult<Option<User>> {
    Ok(state.community_domain.get_accounts().current_user().await?)
}
