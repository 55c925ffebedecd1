use crate::{
    extractor::AuthorizedUser,
    model::booking::{
        BookingIdResponse, BookingResponse, CreateBookingRequest, RelocateBookingRequest,
    },
};
use axum::{
    extract::{Path, State},
    Json,
};
use garde::Validate;
use kernel::model::{
    booking::event::{CreateBooking, RelocateBooking},
    id::BookingId,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

// ログイン中のユーザーの現在の宿泊予約を取得する
pub async fn show_current_booking(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingResponse>> {
    registry
        .booking_repository()
        .find_current_by_user_id(user.id())
        .await
        .and_then(|booking| match booking {
            Some(booking) => Ok(Json(booking.into())),
            None => Err(AppError::EntityNotFound(
                "宿泊予約が見つかりませんでした。".into(),
            )),
        })
}

// 宿泊予約を登録する
pub async fn register_booking(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingIdResponse>> {
    req.validate(&())?;

    registry
        .booking_repository()
        .create(CreateBooking::new(req.room_id, user.id()))
        .await
        .map(BookingIdResponse::from)
        .map(Json)
}

// 宿泊予約の部屋を変更する
pub async fn relocate_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<RelocateBookingRequest>,
) -> AppResult<Json<BookingIdResponse>> {
    req.validate(&())?;

    registry
        .booking_repository()
        .relocate(RelocateBooking::new(booking_id, req.room_id, user.id()))
        .await
        .map(BookingIdResponse::from)
        .map(Json)
}
