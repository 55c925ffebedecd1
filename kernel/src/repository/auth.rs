use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    auth::{event::CreateToken, AccessToken},
    id::UserId,
};

#[async_trait]
pub trait AuthRepository: Send + Sync {
    // アクセストークンからユーザー ID を取得する
    async fn fetch_user_id_from_token(&self, access_token: &AccessToken)
        -> AppResult<Option<UserId>>;
    // メールアドレスとパスワードからユーザーを認証する
    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId>;
    // アクセストークンを発行する
    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken>;
    // アクセストークンを破棄する
    async fn delete_token(&self, access_token: &AccessToken) -> AppResult<()>;
}
