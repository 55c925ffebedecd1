use derive_new::new;

use crate::model::id::{BookingId, RoomId, UserId};

#[derive(new)]
pub struct CreateBooking {
    pub room_id: RoomId,
    pub booked_by: UserId,
}

#[derive(new)]
pub struct RelocateBooking {
    pub booking_id: BookingId,
    pub room_id: RoomId,
    pub requested_user: UserId,
}
