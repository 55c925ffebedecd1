use garde::Validate;
use kernel::model::{
    booking::{Booking, BookingRoom},
    id::{BookingId, HotelId, RoomId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[garde(skip)]
    pub room_id: RoomId,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RelocateBookingRequest {
    #[garde(skip)]
    pub room_id: RoomId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingIdResponse {
    pub booking_id: BookingId,
}

impl From<BookingId> for BookingIdResponse {
    fn from(value: BookingId) -> Self {
        Self { booking_id: value }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: BookingId,
    pub room: BookingRoomResponse,
}

impl From<Booking> for BookingResponse {
    fn from(value: Booking) -> Self {
        let Booking {
            booking_id,
            booked_by: _,
            booked_at: _,
            room,
        } = value;
        Self {
            id: booking_id,
            room: room.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRoomResponse {
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub room_name: String,
    pub capacity: i32,
}

impl From<BookingRoom> for BookingRoomResponse {
    fn from(value: BookingRoom) -> Self {
        let BookingRoom {
            room_id,
            hotel_id,
            room_name,
            capacity,
        } = value;
        Self {
            room_id,
            hotel_id,
            room_name,
            capacity,
        }
    }
}
