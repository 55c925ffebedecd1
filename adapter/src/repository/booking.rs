use crate::database::{
    model::{booking::BookingRow, room::RoomRow, ticket::TicketRow},
    ConnectionPool,
};
use async_trait::async_trait;

use derive_new::new;
use kernel::model::booking::{
    event::{CreateBooking, RelocateBooking},
    Booking,
};
use kernel::model::id::{BookingId, EnrollmentId, RoomId, UserId};
use kernel::model::room::Room;
use kernel::model::ticket::Ticket;
use kernel::repository::booking::BookingRepository;
use shared::error::{AppError, AppResult};

#[derive(new)]
pub struct BookingRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BookingRepository for BookingRepositoryImpl {
    // 宿泊予約を登録する
    async fn create(&self, event: CreateBooking) -> AppResult<BookingId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        self.set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定の部屋 ID をもつ部屋が存在するか
        // - 存在した場合、その部屋に空きがあるか
        // - ユーザーの参加登録が存在するか
        // - 参加登録に紐づくチケットが宿泊予約の資格を満たすか
        // - ユーザーがまだ宿泊予約を持っていないか
        //
        // 上記のすべてが Yes だった場合、このブロック以降の処理に進む
        {
            //
            // ① 部屋の存在確認
            //
            let room = self.find_room_by_id(&mut tx, event.room_id).await?;

            let Some(room) = room else {
                return Err(AppError::EntityNotFound(format!(
                    "部屋（{}）が見つかりませんでした。",
                    event.room_id
                )));
            };

            //
            // ② 部屋の空き確認
            //    予約数が定員以上の場合は満室として扱う
            //
            let occupancy = self.count_bookings_for_room(&mut tx, event.room_id).await?;
            if occupancy >= room.capacity as i64 {
                return Err(AppError::ForbiddenOperation(format!(
                    "部屋（{}）は満室です。",
                    event.room_id
                )));
            }

            //
            // ③ 参加登録の存在確認
            //
            let enrollment_id = self
                .find_enrollment_by_user_id(&mut tx, event.booked_by)
                .await?;

            let Some(enrollment_id) = enrollment_id else {
                return Err(AppError::EntityNotFound(format!(
                    "ユーザー（{}）の参加登録が見つかりませんでした。",
                    event.booked_by
                )));
            };

            //
            // ④ チケットの資格確認
            //    支払い済みかつ現地参加かつホテル付きのチケットだけが予約できる
            //
            let ticket = self
                .find_ticket_by_enrollment_id(&mut tx, enrollment_id)
                .await?;

            let Some(ticket) = ticket else {
                return Err(AppError::ForbiddenOperation(
                    "チケットがないため宿泊予約できません。".into(),
                ));
            };

            if !ticket.is_hotel_eligible() {
                return Err(AppError::ForbiddenOperation(
                    "チケットが宿泊予約の対象外です。".into(),
                ));
            }

            //
            // ⑤ 既存予約の有無確認
            //    1 ユーザーにつき宿泊予約は 1 件まで
            //
            let existing = self
                .find_booking_by_user_id(&mut tx, event.booked_by)
                .await?;

            if existing.is_some() {
                return Err(AppError::ForbiddenOperation(format!(
                    "ユーザー（{}）にはすでに宿泊予約があります。",
                    event.booked_by
                )));
            }
        }

        // 予約処理を行う、すなわち bookings テーブルにレコードを追加する
        let booking_id = BookingId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO bookings (booking_id, user_id, room_id)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(booking_id)
        .bind(event.booked_by)
        .bind(event.room_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(booking_id)
    }

    // 宿泊予約の部屋を変更する
    async fn relocate(&self, event: RelocateBooking) -> AppResult<BookingId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        self.set_transaction_serializable(&mut tx).await?;

        // 部屋変更時は事前のチェックとして、以下を調べる。
        // - 変更先の部屋が存在するか
        // - 変更先の部屋に空きがあるか
        // - ユーザー自身の宿泊予約が存在するか
        // - 指定された予約 ID がその予約と一致するか
        //
        // 上記のすべてが Yes だった場合、このブロック以降の処理に進む
        {
            //
            // ① 変更先の部屋の存在確認
            //
            let room = self.find_room_by_id(&mut tx, event.room_id).await?;

            let Some(room) = room else {
                return Err(AppError::EntityNotFound(format!(
                    "部屋（{}）が見つかりませんでした。",
                    event.room_id
                )));
            };

            //
            // ② 変更先の部屋の空き確認
            //
            let occupancy = self.count_bookings_for_room(&mut tx, event.room_id).await?;
            if occupancy >= room.capacity as i64 {
                return Err(AppError::ForbiddenOperation(format!(
                    "部屋（{}）は満室です。",
                    event.room_id
                )));
            }

            //
            // ③ ユーザー自身の宿泊予約の存在確認
            //    認証済みユーザーに予約がない場合は EntityNotFound ではなく
            //    ForbiddenOperation を返す
            //
            let current_booking_id = self
                .find_booking_by_user_id(&mut tx, event.requested_user)
                .await?;

            let Some(current_booking_id) = current_booking_id else {
                return Err(AppError::ForbiddenOperation(format!(
                    "ユーザー（{}）には変更できる宿泊予約がありません。",
                    event.requested_user
                )));
            };

            //
            // ④ 指定された予約 ID との一致確認
            //
            if current_booking_id != event.booking_id {
                return Err(AppError::ForbiddenOperation(format!(
                    "予約（{}）はユーザー（{}）の宿泊予約ではありません。",
                    event.booking_id, event.requested_user
                )));
            }
        }

        // 部屋の変更処理を行う、すなわち該当レコードの room_id を更新する
        let res = sqlx::query(
            r#"
                UPDATE bookings
                SET room_id = $1
                WHERE booking_id = $2
            "#,
        )
        .bind(event.room_id)
        .bind(event.booking_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(event.booking_id)
    }

    // ユーザー ID に紐づく現在の宿泊予約を取得する
    async fn find_current_by_user_id(&self, user_id: UserId) -> AppResult<Option<Booking>> {
        // bookings テーブルと rooms テーブルを INNER JOIN し、部屋の情報も一緒に抽出する
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
                SELECT
                    b.booking_id,
                    b.user_id,
                    b.booked_at,
                    r.room_id,
                    r.hotel_id,
                    r.room_name,
                    r.capacity
                FROM bookings AS b
                INNER JOIN rooms AS r ON b.room_id = r.room_id
                WHERE b.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Booking::from))
    }

    // 部屋 ID に紐づく宿泊予約数を取得する
    async fn count_by_room_id(&self, room_id: RoomId) -> AppResult<i64> {
        sqlx::query_scalar(
            r#"
                SELECT COUNT(*)
                FROM bookings
                WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_one(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)
    }
}

impl BookingRepositoryImpl {
    // create, relocate メソッドでのトランザクションを利用するにあたり
    // トランザクション分離レベルを SERIALIZABLE にするために
    // 内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    async fn find_room_by_id(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        room_id: RoomId,
    ) -> AppResult<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(
            r#"
                SELECT
                    room_id,
                    hotel_id,
                    room_name,
                    capacity
                FROM rooms
                WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Room::from))
    }

    async fn count_bookings_for_room(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        room_id: RoomId,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            r#"
                SELECT COUNT(*)
                FROM bookings
                WHERE room_id = $1
            "#,
        )
        .bind(room_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)
    }

    async fn find_enrollment_by_user_id(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: UserId,
    ) -> AppResult<Option<EnrollmentId>> {
        sqlx::query_scalar(
            r#"
                SELECT enrollment_id
                FROM enrollments
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)
    }

    async fn find_ticket_by_enrollment_id(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        enrollment_id: EnrollmentId,
    ) -> AppResult<Option<Ticket>> {
        // tickets テーブルと ticket_types テーブルを INNER JOIN し、
        // チケット種別のフラグも一緒に抽出する
        let row: Option<TicketRow> = sqlx::query_as(
            r#"
                SELECT
                    t.ticket_id,
                    t.enrollment_id,
                    t.status,
                    tt.ticket_type_id,
                    tt.type_name,
                    tt.is_remote,
                    tt.includes_hotel
                FROM tickets AS t
                INNER JOIN ticket_types AS tt ON t.ticket_type_id = tt.ticket_type_id
                WHERE t.enrollment_id = $1
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Ticket::from))
    }

    async fn find_booking_by_user_id(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: UserId,
    ) -> AppResult<Option<BookingId>> {
        sqlx::query_scalar(
            r#"
                SELECT booking_id
                FROM bookings
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::SpecificOperationError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // fixtures/booking.sql で投入しているレコードの ID
    const SINGLE_ROOM: &str = "22222222-2222-2222-2222-222222222201"; // 定員 1
    const TWIN_ROOM: &str = "22222222-2222-2222-2222-222222222202"; // 定員 2
    const TRIPLE_ROOM: &str = "22222222-2222-2222-2222-222222222203"; // 定員 3
    const PAID_USER1: &str = "33333333-3333-3333-3333-333333333301"; // 支払い済み・現地・ホテル付き
    const PAID_USER2: &str = "33333333-3333-3333-3333-333333333302"; // 支払い済み・現地・ホテル付き
    const RESERVED_USER: &str = "33333333-3333-3333-3333-333333333303"; // 未払い
    const REMOTE_USER: &str = "33333333-3333-3333-3333-333333333304"; // リモート参加
    const NO_HOTEL_USER: &str = "33333333-3333-3333-3333-333333333305"; // ホテルなしプラン
    const NO_ENROLLMENT_USER: &str = "33333333-3333-3333-3333-333333333306"; // 参加登録なし
    const NO_TICKET_USER: &str = "33333333-3333-3333-3333-333333333307"; // チケットなし

    fn room(id: &str) -> RoomId {
        RoomId::from_str(id).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::from_str(id).unwrap()
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_and_fetch(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let booking_id = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(PAID_USER1)))
            .await?;

        let booking = repo.find_current_by_user_id(user(PAID_USER1)).await?;
        assert!(booking.is_some());

        let booking = booking.unwrap();
        assert_eq!(booking.booking_id, booking_id);
        assert_eq!(booking.booked_by, user(PAID_USER1));
        assert_eq!(booking.room.room_id, room(TRIPLE_ROOM));
        assert_eq!(booking.room.room_name, "Triple 301");
        assert_eq!(booking.room.capacity, 3);

        assert_eq!(repo.count_by_room_id(room(TRIPLE_ROOM)).await?, 1);

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_when_room_is_full(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        // 定員 1 の部屋を先のユーザーで埋めておく
        repo.create(CreateBooking::new(room(SINGLE_ROOM), user(PAID_USER2)))
            .await?;

        let res = repo
            .create(CreateBooking::new(room(SINGLE_ROOM), user(PAID_USER1)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        // 予約数は増えていないこと
        assert_eq!(repo.count_by_room_id(room(SINGLE_ROOM)).await?, 1);

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_succeeds_with_remaining_capacity(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        repo.create(CreateBooking::new(room(TWIN_ROOM), user(PAID_USER2)))
            .await?;

        // 定員 2 に対して予約 1 件なので、まだ予約できる
        repo.create(CreateBooking::new(room(TWIN_ROOM), user(PAID_USER1)))
            .await?;

        assert_eq!(repo.count_by_room_id(room(TWIN_ROOM)).await?, 2);

        // 定員 2 に対して予約 2 件なので、3 人目は満室で予約できない。
        // 空き確認は参加登録の確認より先に行われるため、参加登録のない
        // ユーザーでも EntityNotFound ではなく満室のエラーになる
        let res = repo
            .create(CreateBooking::new(room(TWIN_ROOM), user(NO_ENROLLMENT_USER)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));
        assert_eq!(repo.count_by_room_id(room(TWIN_ROOM)).await?, 2);

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_for_missing_room(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(RoomId::new(), user(PAID_USER1)))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_without_enrollment(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(NO_ENROLLMENT_USER)))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_for_unpaid_ticket(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(RESERVED_USER)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_for_remote_ticket(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(REMOTE_USER)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_for_ticket_without_hotel(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(NO_HOTEL_USER)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_fails_without_ticket(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(NO_TICKET_USER)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_create_booking_twice_fails(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        repo.create(CreateBooking::new(room(TRIPLE_ROOM), user(PAID_USER1)))
            .await?;

        let res = repo
            .create(CreateBooking::new(room(TWIN_ROOM), user(PAID_USER1)))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        // 予約が重複して作成されていないこと
        assert_eq!(repo.count_by_room_id(room(TRIPLE_ROOM)).await?, 1);
        assert_eq!(repo.count_by_room_id(room(TWIN_ROOM)).await?, 0);

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_relocate_booking(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let booking_id = repo
            .create(CreateBooking::new(room(SINGLE_ROOM), user(PAID_USER1)))
            .await?;

        let relocated_id = repo
            .relocate(RelocateBooking::new(
                booking_id,
                room(TWIN_ROOM),
                user(PAID_USER1),
            ))
            .await?;
        assert_eq!(relocated_id, booking_id);

        let booking = repo.find_current_by_user_id(user(PAID_USER1)).await?.unwrap();
        assert_eq!(booking.room.room_id, room(TWIN_ROOM));

        assert_eq!(repo.count_by_room_id(room(SINGLE_ROOM)).await?, 0);
        assert_eq!(repo.count_by_room_id(room(TWIN_ROOM)).await?, 1);

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_relocate_booking_fails_when_target_is_full(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        // 定員 1 の部屋を先のユーザーで埋めておく
        repo.create(CreateBooking::new(room(SINGLE_ROOM), user(PAID_USER2)))
            .await?;

        let booking_id = repo
            .create(CreateBooking::new(room(TWIN_ROOM), user(PAID_USER1)))
            .await?;

        let res = repo
            .relocate(RelocateBooking::new(
                booking_id,
                room(SINGLE_ROOM),
                user(PAID_USER1),
            ))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        // 元の予約は変更されないままであること
        let booking = repo.find_current_by_user_id(user(PAID_USER1)).await?.unwrap();
        assert_eq!(booking.room.room_id, room(TWIN_ROOM));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_relocate_booking_fails_without_booking(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo
            .relocate(RelocateBooking::new(
                BookingId::new(),
                room(TWIN_ROOM),
                user(PAID_USER1),
            ))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_relocate_booking_fails_for_mismatched_booking_id(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        repo.create(CreateBooking::new(room(TRIPLE_ROOM), user(PAID_USER1)))
            .await?;

        // 自分の予約とは別の予約 ID を指定する
        let res = repo
            .relocate(RelocateBooking::new(
                BookingId::new(),
                room(TWIN_ROOM),
                user(PAID_USER1),
            ))
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation(_))));

        let booking = repo.find_current_by_user_id(user(PAID_USER1)).await?.unwrap();
        assert_eq!(booking.room.room_id, room(TRIPLE_ROOM));

        Ok(())
    }

    #[sqlx::test(fixtures("booking"))]
    async fn test_relocate_booking_fails_for_missing_room(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = BookingRepositoryImpl::new(ConnectionPool::new(pool));

        let booking_id = repo
            .create(CreateBooking::new(room(TRIPLE_ROOM), user(PAID_USER1)))
            .await?;

        let res = repo
            .relocate(RelocateBooking::new(
                booking_id,
                RoomId::new(),
                user(PAID_USER1),
            ))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        Ok(())
    }
}
