use kernel::model::{
    booking::{Booking, BookingRoom},
    id::{BookingId, HotelId, RoomId, UserId},
};
use sqlx::types::chrono::{DateTime, Utc};

// 宿泊予約を部屋情報付きで取得する際に使う型
#[derive(sqlx::FromRow)]
pub struct BookingRow {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub booked_at: DateTime<Utc>,
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub room_name: String,
    pub capacity: i32,
}

impl From<BookingRow> for Booking {
    fn from(value: BookingRow) -> Self {
        let BookingRow {
            booking_id,
            user_id,
            booked_at,
            room_id,
            hotel_id,
            room_name,
            capacity,
        } = value;
        Booking {
            booking_id,
            booked_by: user_id,
            booked_at,
            room: BookingRoom {
                room_id,
                hotel_id,
                room_name,
                capacity,
            },
        }
    }
}
