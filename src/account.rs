// 账户存储 - 本地注册用户列表与当前登录用户
//
// 只保存用户名与邮箱，不保存密码

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::storage::{BlobStore, KEY_CURRENT_USER, KEY_REGISTERED_USERS};

/// 注册表单
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub struct AccountStore {
    store: BlobStore,
    username_pattern: Regex,
    email_pattern: Regex,
}

fn reject(message: &str) -> AppError {
    AppError::Account(message.to_string())
}

impl AccountStore {
    pub fn new(store: BlobStore) -> Result<Self> {
        Ok(Self {
            store,
            username_pattern: Regex::new(r"^[a-zA-Z0-9가-힣_.\-]+$")?,
            email_pattern: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
        })
    }

    async fn registered_users(&self) -> AppResult<Vec<User>> {
        Ok(self
            .store
            .load::<Vec<User>>(KEY_REGISTERED_USERS)
            .await?
            .unwrap_or_default())
    }

    /// 注册并直接登录
    pub async fn register(&self, form: RegisterForm) -> AppResult<User> {
        if form.password != form.confirm_password {
            return Err(reject("비밀번호가 일치하지 않습니다."));
        }

        let username = form.username.trim();
        if username.is_empty() {
            return Err(reject("아이디를 입력하세요."));
        }
        let length = username.chars().count();
        if !(6..=20).contains(&length) {
            return Err(reject("아이디는 6~20자 사이여야 합니다."));
        }
        if !self.username_pattern.is_match(username) {
            return Err(reject("아이디는 영문, 숫자, 한글, _, ., -만 가능합니다."));
        }

        let mut users = self.registered_users().await?;
        if users.iter().any(|user| user.name == username) {
            return Err(reject("이미 사용 중인 아이디입니다."));
        }

        let email = form.email.trim();
        if !email.contains('@') || !email.contains('.') {
            return Err(reject("올바른 이메일 주소를 입력하세요 (@와 . 포함)"));
        }
        if !self.email_pattern.is_match(email) {
            return Err(reject("올바른 이메일 형식이 아닙니다."));
        }

        if form.password.chars().count() < 8 {
            return Err(reject("비밀번호는 8자 이상이어야 합니다."));
        }
        let has_letter = form.password.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = form.password.chars().any(|c| c.is_ascii_digit());
        if !has_letter || !has_digit {
            return Err(reject("비밀번호는 영문과 숫자를 1개 이상 포함해야 합니다."));
        }

        let user = User {
            id: Utc::now().timestamp_millis(),
            name: username.to_string(),
            email: Some(email.to_string()),
        };
        users.push(user.clone());
        self.store.save(KEY_REGISTERED_USERS, &users).await?;
        self.store.save(KEY_CURRENT_USER, &user).await?;

        info!("新用户注册: {}", user.name);
        Ok(user)
    }

    /// 按用户名登录
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(reject("아이디와 비밀번호를 입력하세요."));
        }

        let users = self.registered_users().await?;
        let Some(user) = users.into_iter().find(|user| user.name == username) else {
            warn!("未注册的用户尝试登录: {}", username);
            return Err(reject("등록된 계정이 아닙니다. 회원가입 후 로그인하세요."));
        };

        self.store.save(KEY_CURRENT_USER, &user).await?;
        info!("用户登录: {}", user.name);
        Ok(user)
    }

    pub async fn logout(&self) -> AppResult<()> {
        self.store.remove(KEY_CURRENT_USER).await?;
        Ok(())
    }

    /// 当前登录用户（数据损坏时视为未登录）
    pub async fn current_user(&self) -> AppResult<Option<User>> {
        Ok(self.store.load::<User>(KEY_CURRENT_USER).await?)
    }

    /// 需要登录的操作使用
    pub async fn require_user(&self) -> AppResult<User> {
        self.current_user().await?.ok_or(AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        }
    }

    fn accounts() -> AccountStore {
        AccountStore::new(BlobStore::in_memory()).unwrap()
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Account(message) => message,
            other => panic!("应为 Account 错误: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let accounts = accounts();
        let user = accounts
            .register(form("창업준비생01", "me@example.com", "abcd1234"))
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("me@example.com"));
        assert_eq!(accounts.current_user().await.unwrap(), Some(user.clone()));

        accounts.logout().await.unwrap();
        assert!(accounts.current_user().await.unwrap().is_none());
        assert!(matches!(
            accounts.require_user().await,
            Err(AppError::Unauthenticated)
        ));

        let again = accounts.login("창업준비생01", "anything").await.unwrap();
        assert_eq!(again, user);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let accounts = accounts();

        let mut mismatch = form("tester01", "a@b.co", "abcd1234");
        mismatch.confirm_password = "abcd12345".to_string();
        assert!(message(accounts.register(mismatch).await.unwrap_err()).contains("일치"));

        let err = accounts.register(form("short", "a@b.co", "abcd1234")).await.unwrap_err();
        assert!(message(err).contains("6~20자"));

        let err = accounts.register(form("bad name!", "a@b.co", "abcd1234")).await.unwrap_err();
        assert!(message(err).contains("영문, 숫자, 한글"));

        let err = accounts.register(form("tester01", "a@b", "abcd1234")).await.unwrap_err();
        assert!(message(err).contains("이메일"));

        let err = accounts.register(form("tester01", "a b@c.d", "abcd1234")).await.unwrap_err();
        assert!(message(err).contains("이메일 형식"));

        let err = accounts.register(form("tester01", "a@b.co", "abc123")).await.unwrap_err();
        assert!(message(err).contains("8자"));

        let err = accounts.register(form("tester01", "a@b.co", "abcdefgh")).await.unwrap_err();
        assert!(message(err).contains("영문과 숫자"));

        accounts.register(form("tester01", "a@b.co", "abcd1234")).await.unwrap();
        let err = accounts.register(form("tester01", "c@d.co", "abcd1234")).await.unwrap_err();
        assert!(message(err).contains("이미 사용 중"));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let accounts = accounts();
        let err = accounts.login("nobody99", "abcd1234").await.unwrap_err();
        assert!(message(err).contains("등록된 계정이 아닙니다"));
        assert!(accounts.current_user().await.unwrap().is_none());
    }
}
