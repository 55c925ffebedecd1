use crate::model::{
    booking::{
        event::{CreateBooking, RelocateBooking},
        Booking,
    },
    id::{BookingId, RoomId, UserId},
};
use async_trait::async_trait;
use shared::error::AppResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    // 宿泊予約を登録する
    async fn create(&self, event: CreateBooking) -> AppResult<BookingId>;
    // 宿泊予約の部屋を変更する
    async fn relocate(&self, event: RelocateBooking) -> AppResult<BookingId>;
    // ユーザー ID に紐づく現在の宿泊予約を取得する
    async fn find_current_by_user_id(&self, user_id: UserId) -> AppResult<Option<Booking>>;
    // 部屋 ID に紐づく宿泊予約数を取得する
    async fn count_by_room_id(&self, room_id: RoomId) -> AppResult<i64>;
}
