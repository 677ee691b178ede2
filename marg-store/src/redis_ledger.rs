use async_trait::async_trait;
use chrono::NaiveDate;
use redis::aio::MultiplexedConnection;
use tracing::debug;
use uuid::Uuid;

use marg_ledger::{Denial, LedgerError, LedgerKey, Reservation, SeatLedger};

/// Redis-backed seat ledger for multi-node deployments. Holds are keys with
/// a TTL; paid entries are the same keys persisted. Every operation is a
/// single server-side script, so the occupancy check and the write stay one
/// atomic step.
pub struct RedisSeatLedger {
    client: redis::Client,
}

impl RedisSeatLedger {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<MultiplexedConnection, LedgerError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }
}

fn backend(e: redis::RedisError) -> LedgerError {
    LedgerError::Backend(e.to_string())
}

fn seat_key(key: &LedgerKey) -> String {
    format!(
        "seat:{}:{}:{}",
        key.route_id, key.travel_date, key.seat_number
    )
}

#[async_trait]
impl SeatLedger for RedisSeatLedger {
    async fn try_reserve(
        &self,
        key: &LedgerKey,
        owner: Uuid,
        total_seats: u16,
        hold_seconds: u64,
    ) -> Result<Reservation, LedgerError> {
        if key.seat_number < 1 || key.seat_number > total_seats {
            return Ok(Reservation::Denied(Denial::OutOfRange));
        }

        let mut conn = self.conn().await?;
        // Vacant: claim with a TTL. Our own hold: refresh the TTL (a paid
        // entry has no TTL and keeps none). Someone else's: denied.
        let script = redis::Script::new(
            r#"
            local v = redis.call("GET", KEYS[1])
            if not v then
                redis.call("SET", KEYS[1], ARGV[1], "EX", ARGV[2])
                return 1
            elseif v == ARGV[1] then
                if redis.call("TTL", KEYS[1]) > 0 then
                    redis.call("EXPIRE", KEYS[1], ARGV[2])
                end
                return 1
            else
                return 0
            end
            "#,
        );

        let granted: i32 = script
            .key(seat_key(key))
            .arg(owner.to_string())
            .arg(hold_seconds.max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        if granted == 1 {
            debug!(key = %seat_key(key), owner = %owner, "seat hold acquired");
            Ok(Reservation::Granted)
        } else {
            Ok(Reservation::Denied(Denial::AlreadyTaken))
        }
    }

    async fn commit(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError> {
        let mut conn = self.conn().await?;
        // Re-setting without EX drops the TTL, which is what makes the
        // entry paid. A vacant key (hold expired, nobody claimed it) is
        // re-locked in the same step.
        let script = redis::Script::new(
            r#"
            local v = redis.call("GET", KEYS[1])
            if not v or v == ARGV[1] then
                redis.call("SET", KEYS[1], ARGV[1])
                return 1
            else
                return 0
            end
            "#,
        );

        let committed: i32 = script
            .key(seat_key(key))
            .arg(owner.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        if committed == 1 {
            Ok(())
        } else {
            Err(LedgerError::HoldExpired)
        }
    }

    async fn release(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError> {
        let mut conn = self.conn().await?;
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                redis.call("DEL", KEYS[1])
            end
            return 1
            "#,
        );

        let _: i32 = script
            .key(seat_key(key))
            .arg(owner.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn occupied(
        &self,
        route_id: Uuid,
        travel_date: NaiveDate,
    ) -> Result<Vec<u16>, LedgerError> {
        let mut conn = self.conn().await?;
        let pattern = format!("seat:{}:{}:*", route_id, travel_date);
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        let mut seats: Vec<u16> = keys
            .iter()
            .filter_map(|k| k.rsplit(':').next())
            .filter_map(|s| s.parse().ok())
            .collect();
        seats.sort_unstable();
        Ok(seats)
    }

    async fn sweep_expired(&self) -> Result<usize, LedgerError> {
        // Redis drops lapsed holds through key TTLs; nothing to sweep here.
        Ok(0)
    }
}
