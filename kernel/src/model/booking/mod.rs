use crate::model::id::{BookingId, HotelId, RoomId, UserId};
use chrono::{DateTime, Utc};

pub mod event;

#[derive(Debug)]
pub struct Booking {
    pub booking_id: BookingId,
    pub booked_by: UserId,
    pub booked_at: DateTime<Utc>,
    pub room: BookingRoom,
}

#[derive(Debug)]
pub struct BookingRoom {
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub room_name: String,
    pub capacity: i32,
}
