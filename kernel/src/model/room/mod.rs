use crate::model::id::{HotelId, RoomId};

#[derive(Debug)]
pub struct Room {
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub room_name: String,
    pub capacity: i32,
}
