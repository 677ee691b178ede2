use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{Denial, LedgerError, LedgerKey, Reservation, SeatLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupancy {
    Held { expires_at: DateTime<Utc> },
    Paid,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    owner: Uuid,
    occupancy: Occupancy,
}

impl LedgerEntry {
    fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        match self.occupancy {
            Occupancy::Held { expires_at } => expires_at <= now,
            Occupancy::Paid => false,
        }
    }
}

/// In-memory seat ledger. A single mutex around the key map makes the
/// occupancy check and the write one critical section, which is the entire
/// concurrency contract of the ledger.
pub struct MemorySeatLedger {
    entries: Mutex<HashMap<LedgerKey, LedgerEntry>>,
}

impl MemorySeatLedger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemorySeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeatLedger for MemorySeatLedger {
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

        let mut entries = self.entries.lock().await;
        let now = Utc::now();

        if let Some(entry) = entries.get_mut(key) {
            if entry.owner == owner {
                // Refresh our own hold; a paid entry stays paid.
                if let Occupancy::Held { .. } = entry.occupancy {
                    entry.occupancy = Occupancy::Held {
                        expires_at: now + Duration::seconds(hold_seconds as i64),
                    };
                }
                return Ok(Reservation::Granted);
            }
            if !entry.is_lapsed(now) {
                return Ok(Reservation::Denied(Denial::AlreadyTaken));
            }
        }

        entries.insert(
            key.clone(),
            LedgerEntry {
                owner,
                occupancy: Occupancy::Held {
                    expires_at: now + Duration::seconds(hold_seconds as i64),
                },
            },
        );
        Ok(Reservation::Granted)
    }

    async fn commit(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        let now = Utc::now();

        match entries.get_mut(key) {
            // Still ours, lapsed or not: promote in place.
            Some(entry) if entry.owner == owner => {
                entry.occupancy = Occupancy::Paid;
                Ok(())
            }
            // Someone else's lapsed hold: the seat is vacant, re-lock it.
            Some(entry) if entry.is_lapsed(now) => {
                *entry = LedgerEntry {
                    owner,
                    occupancy: Occupancy::Paid,
                };
                Ok(())
            }
            Some(_) => Err(LedgerError::HoldExpired),
            // Swept while we were paying: the seat is free, re-lock it.
            None => {
                entries.insert(
                    key.clone(),
                    LedgerEntry {
                        owner,
                        occupancy: Occupancy::Paid,
                    },
                );
                Ok(())
            }
        }
    }

    async fn release(&self, key: &LedgerKey, owner: Uuid) -> Result<(), LedgerError> {
        let mut entries = self.entries.lock().await;
        if entries.get(key).map(|e| e.owner) == Some(owner) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn occupied(
        &self,
        route_id: Uuid,
        travel_date: NaiveDate,
    ) -> Result<Vec<u16>, LedgerError> {
        let entries = self.entries.lock().await;
        let now = Utc::now();
        let mut seats: Vec<u16> = entries
            .iter()
            .filter(|(key, entry)| {
                key.route_id == route_id && key.travel_date == travel_date && !entry.is_lapsed(now)
            })
            .map(|(key, _)| key.seat_number)
            .collect();
        seats.sort_unstable();
        Ok(seats)
    }

    async fn sweep_expired(&self) -> Result<usize, LedgerError> {
        let mut entries = self.entries.lock().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_lapsed(now));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(route_id: Uuid, seat: u16) -> LedgerKey {
        LedgerKey::new(
            route_id,
            NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            seat,
        )
    }

    #[tokio::test]
    async fn test_reserve_then_deny() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let asha = Uuid::new_v4();
        let ravi = Uuid::new_v4();

        let granted = ledger.try_reserve(&key(route, 1), asha, 50, 300).await.unwrap();
        assert_eq!(granted, Reservation::Granted);

        let denied = ledger.try_reserve(&key(route, 1), ravi, 50, 300).await.unwrap();
        assert_eq!(denied, Reservation::Denied(Denial::AlreadyTaken));

        // A different seat on the same departure is independent.
        let granted = ledger.try_reserve(&key(route, 2), ravi, 50, 300).await.unwrap();
        assert_eq!(granted, Reservation::Granted);
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let denied = ledger.try_reserve(&key(route, 0), owner, 50, 300).await.unwrap();
        assert_eq!(denied, Reservation::Denied(Denial::OutOfRange));

        let denied = ledger.try_reserve(&key(route, 51), owner, 50, 300).await.unwrap();
        assert_eq!(denied, Reservation::Denied(Denial::OutOfRange));
    }

    #[tokio::test]
    async fn test_release_makes_seat_reservable() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        ledger.try_reserve(&key(route, 5), first, 50, 300).await.unwrap();
        ledger.release(&key(route, 5), first).await.unwrap();

        let granted = ledger.try_reserve(&key(route, 5), second, 50, 300).await.unwrap();
        assert_eq!(granted, Reservation::Granted);
    }

    #[tokio::test]
    async fn test_release_is_owner_scoped_and_idempotent() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        ledger.try_reserve(&key(route, 7), owner, 50, 300).await.unwrap();

        // A stranger's release must not touch the entry.
        ledger.release(&key(route, 7), stranger).await.unwrap();
        let denied = ledger.try_reserve(&key(route, 7), stranger, 50, 300).await.unwrap();
        assert_eq!(denied, Reservation::Denied(Denial::AlreadyTaken));

        // Double release by the owner is a no-op.
        ledger.release(&key(route, 7), owner).await.unwrap();
        ledger.release(&key(route, 7), owner).await.unwrap();
    }

    #[tokio::test]
    async fn test_lapsed_hold_counts_as_vacant() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        // Zero-second hold lapses immediately.
        ledger.try_reserve(&key(route, 3), first, 50, 0).await.unwrap();

        let granted = ledger.try_reserve(&key(route, 3), second, 50, 300).await.unwrap();
        assert_eq!(granted, Reservation::Granted);
    }

    #[tokio::test]
    async fn test_commit_relocks_own_lapsed_hold() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let owner = Uuid::new_v4();

        ledger.try_reserve(&key(route, 9), owner, 50, 0).await.unwrap();
        // The hold has lapsed but nobody claimed the seat; commit wins.
        ledger.commit(&key(route, 9), owner).await.unwrap();

        let denied = ledger
            .try_reserve(&key(route, 9), Uuid::new_v4(), 50, 300)
            .await
            .unwrap();
        assert_eq!(denied, Reservation::Denied(Denial::AlreadyTaken));
    }

    #[tokio::test]
    async fn test_commit_loses_to_newer_claim() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        ledger.try_reserve(&key(route, 9), first, 50, 0).await.unwrap();
        ledger.try_reserve(&key(route, 9), second, 50, 300).await.unwrap();

        // The lapsed hold must not overwrite the newer owner's claim.
        let err = ledger.commit(&key(route, 9), first).await.unwrap_err();
        assert!(matches!(err, LedgerError::HoldExpired));

        // And the newer owner can still commit.
        ledger.commit(&key(route, 9), second).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_after_sweep() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let owner = Uuid::new_v4();

        ledger.try_reserve(&key(route, 4), owner, 50, 0).await.unwrap();
        assert_eq!(ledger.sweep_expired().await.unwrap(), 1);

        // Entry was swept but the seat is free, so the commit re-locks it.
        ledger.commit(&key(route, 4), owner).await.unwrap();
        let seats = ledger
            .occupied(route, NaiveDate::from_ymd_opt(2026, 9, 14).unwrap())
            .await
            .unwrap();
        assert_eq!(seats, vec![4]);
    }

    #[tokio::test]
    async fn test_occupied_excludes_lapsed_holds() {
        let ledger = MemorySeatLedger::new();
        let route = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2026, 9, 14).unwrap();

        ledger.try_reserve(&key(route, 1), Uuid::new_v4(), 50, 300).await.unwrap();
        ledger.try_reserve(&key(route, 2), Uuid::new_v4(), 50, 0).await.unwrap();
        let paid = Uuid::new_v4();
        ledger.try_reserve(&key(route, 3), paid, 50, 300).await.unwrap();
        ledger.commit(&key(route, 3), paid).await.unwrap();

        let seats = ledger.occupied(route, date).await.unwrap();
        assert_eq!(seats, vec![1, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reserves_grant_exactly_one() {
        let ledger = Arc::new(MemorySeatLedger::new());
        let route = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            let k = key(route, 1);
            handles.push(tokio::spawn(async move {
                ledger.try_reserve(&k, Uuid::new_v4(), 50, 300).await.unwrap()
            }));
        }

        let mut grants = 0;
        for handle in handles {
            if handle.await.unwrap() == Reservation::Granted {
                grants += 1;
            }
        }
        assert_eq!(grants, 1);
    }
}
