use crate::model::id::{EnrollmentId, TicketId, TicketTypeId};

// tickets テーブルの status 列(PostgreSQL の enum 型)に対応する
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ticket_status")]
pub enum TicketStatus {
    #[sqlx(rename = "RESERVED")]
    Reserved,
    #[sqlx(rename = "PAID")]
    Paid,
}

#[derive(Debug)]
pub struct TicketType {
    pub ticket_type_id: TicketTypeId,
    pub type_name: String,
    pub is_remote: bool,
    pub includes_hotel: bool,
}

#[derive(Debug)]
pub struct Ticket {
    pub ticket_id: TicketId,
    pub enrollment_id: EnrollmentId,
    pub status: TicketStatus,
    pub ticket_type: TicketType,
}

impl Ticket {
    // 宿泊予約の資格判定。
    // 支払い確認済み(RESERVED でない)かつ現地参加かつホテル付きのチケットのみ予約できる
    pub fn is_hotel_eligible(&self) -> bool {
        self.status != TicketStatus::Reserved
            && !self.ticket_type.is_remote
            && self.ticket_type.includes_hotel
    }
}
