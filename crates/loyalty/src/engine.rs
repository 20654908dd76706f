//! Core loyalty engine: point accrual from completed reservations,
//! redemption, reversal on cancellation, expiry, and tier transitions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use voyage_core::config::LoyaltyConfig;
use voyage_core::error::{VoyageError, VoyageResult};
use voyage_core::event_bus::{EventSink, LoyaltyEvent};
use voyage_core::loyalty::{
    LedgerEntry, LoyaltyAccount, LoyaltyStatus, Redemption, ReservationCancelled,
    ReservationCompleted, TierCatalog, TransactionKind,
};

use crate::store::AccountStore;

/// Loyalty program engine. All operations run synchronously on the caller's
/// thread; the balance mutation and ledger append for one account commit
/// under that account's store entry guard.
pub struct LoyaltyEngine {
    config: LoyaltyConfig,
    catalog: TierCatalog,
    store: AccountStore,
    events: Arc<dyn EventSink>,
}

impl LoyaltyEngine {
    pub fn new(config: &LoyaltyConfig, catalog: TierCatalog, events: Arc<dyn EventSink>) -> Self {
        info!(
            points_per_unit = config.points_per_unit,
            five_star_bonus = config.five_star_bonus,
            redemption_rate = config.redemption_rate,
            tiers = catalog.tiers().len(),
            "Loyalty engine initialized"
        );
        Self {
            config: config.clone(),
            catalog,
            store: AccountStore::new(),
            events,
        }
    }

    /// Credit points for a completed reservation. Returns the points
    /// credited.
    ///
    /// `base = floor(total_price * points_per_unit)`, plus a five-star bonus
    /// folded into the base before the tier multiplier is applied. The
    /// engine does not deduplicate per reservation; the reservation workflow
    /// checks [`already_accrued`](Self::already_accrued) first.
    pub fn accrue(&self, event: &ReservationCompleted) -> u64 {
        self.store.with(&event.owner_id, |rec| {
            if rec.account.tier_name.is_none() {
                self.recompute_tier(&mut rec.account);
            }

            let base = (event.total_price * self.config.points_per_unit as f64).floor() as u64;
            let bonus = if event.accommodation_stars == Some(5) {
                (base as f64 * self.config.five_star_bonus).floor() as u64
            } else {
                0
            };
            let multiplier = rec
                .account
                .tier_name
                .as_deref()
                .and_then(|name| self.catalog.by_name(name))
                .map(|t| t.bonus_multiplier)
                .unwrap_or(1.0);
            let total = (base.saturating_add(bonus) as f64 * multiplier).floor() as u64;

            rec.account.balance += total;
            rec.account.lifetime_earned += total;
            rec.account.expiry_at = Some(Utc::now() + Duration::days(self.config.expiry_days));
            self.recompute_tier(&mut rec.account);

            rec.ledger.push(LedgerEntry::new(
                &event.owner_id,
                TransactionKind::Earn,
                total as i64,
                Some(event.reservation_id.clone()),
                format!("Points earned from reservation {}", event.reservation_id),
            ));

            metrics::counter!("loyalty.points_earned").increment(total);
            debug!(
                owner_id = %event.owner_id,
                reservation_id = %event.reservation_id,
                base = base,
                bonus = bonus,
                multiplier = multiplier,
                points = total,
                balance = rec.account.balance,
                "Points accrued"
            );
            self.events.emit(LoyaltyEvent::PointsEarned {
                owner_id: event.owner_id.clone(),
                points: total,
                reservation_ref: event.reservation_id.clone(),
                new_balance: rec.account.balance,
            });

            total
        })
    }

    /// Whether an unreversed earn entry already exists for this reservation.
    /// The reservation id is the accrual idempotency key; callers check this
    /// before invoking [`accrue`](Self::accrue).
    pub fn already_accrued(&self, owner_id: &str, reservation_ref: &str) -> bool {
        if !self.store.contains(owner_id) {
            return false;
        }
        self.store.with(owner_id, |rec| {
            rec.ledger.iter().any(|e| {
                e.kind == TransactionKind::Earn
                    && !e.reversed
                    && e.reservation_ref.as_deref() == Some(reservation_ref)
            })
        })
    }

    /// Convert points into a monetary discount. Rejects non-positive
    /// amounts and amounts exceeding the balance without mutating anything.
    pub fn redeem(&self, owner_id: &str, points: i64) -> VoyageResult<Redemption> {
        if points <= 0 {
            return Err(VoyageError::InvalidAmount(points));
        }
        let points = points as u64;

        self.store.with(owner_id, |rec| {
            if points > rec.account.balance {
                return Err(VoyageError::InsufficientBalance {
                    requested: points,
                    available: rec.account.balance,
                });
            }

            let discount_amount = points as f64 * self.config.redemption_rate;
            rec.account.balance -= points;
            rec.account.lifetime_redeemed += points;

            rec.ledger.push(LedgerEntry::new(
                owner_id,
                TransactionKind::Redeem,
                -(points as i64),
                None,
                format!("Redeemed {points} points for a {discount_amount:.2} discount"),
            ));

            metrics::counter!("loyalty.points_redeemed").increment(points);
            metrics::counter!("loyalty.redemptions").increment(1);
            info!(
                owner_id = %owner_id,
                points = points,
                discount = discount_amount,
                balance = rec.account.balance,
                "Points redeemed"
            );
            self.events.emit(LoyaltyEvent::PointsRedeemed {
                owner_id: owner_id.to_string(),
                points,
                discount_amount,
                new_balance: rec.account.balance,
            });

            Ok(Redemption {
                owner_id: owner_id.to_string(),
                points_redeemed: points,
                discount_amount,
                remaining_balance: rec.account.balance,
            })
        })
    }

    /// Undo the accrual for a cancelled reservation. Returns the points
    /// taken back, or 0 when the reservation never earned points.
    ///
    /// The originating earn entry is marked reversed under the same entry
    /// guard as the balance mutation, so a second reversal for the same
    /// reservation finds nothing to undo.
    pub fn reverse(&self, event: &ReservationCancelled) -> u64 {
        if !self.store.contains(&event.owner_id) {
            return 0;
        }
        self.store.with(&event.owner_id, |rec| {
            let entry = rec.ledger.iter_mut().rev().find(|e| {
                e.kind == TransactionKind::Earn
                    && !e.reversed
                    && e.amount > 0
                    && e.reservation_ref.as_deref() == Some(event.reservation_id.as_str())
            });
            let Some(entry) = entry else {
                return 0;
            };

            entry.reversed = true;
            let points = entry.amount as u64;
            rec.account.balance = rec.account.balance.saturating_sub(points);
            rec.account.lifetime_earned = rec.account.lifetime_earned.saturating_sub(points);
            self.recompute_tier(&mut rec.account);

            rec.ledger.push(LedgerEntry::new(
                &event.owner_id,
                TransactionKind::Reversal,
                -(points as i64),
                Some(event.reservation_id.clone()),
                format!(
                    "Points reversed after cancellation of reservation {}",
                    event.reservation_id
                ),
            ));

            metrics::counter!("loyalty.points_reversed").increment(points);
            info!(
                owner_id = %event.owner_id,
                reservation_id = %event.reservation_id,
                points = points,
                balance = rec.account.balance,
                "Accrual reversed"
            );
            self.events.emit(LoyaltyEvent::PointsReversed {
                owner_id: event.owner_id.clone(),
                points,
                reservation_ref: event.reservation_id.clone(),
                new_balance: rec.account.balance,
            });

            points
        })
    }

    /// Expire the remaining balance once the expiry watermark has passed.
    /// Returns the points expired, or 0 when nothing was due.
    pub fn expire_points(&self, owner_id: &str, now: DateTime<Utc>) -> u64 {
        if !self.store.contains(owner_id) {
            return 0;
        }
        self.store.with(owner_id, |rec| {
            let due = rec
                .account
                .expiry_at
                .map(|at| at <= now)
                .unwrap_or(false);
            if !due || rec.account.balance == 0 {
                return 0;
            }

            let points = rec.account.balance;
            rec.account.balance = 0;
            rec.account.lifetime_expired += points;
            rec.account.expiry_at = None;

            rec.ledger.push(LedgerEntry::new(
                owner_id,
                TransactionKind::Expire,
                -(points as i64),
                None,
                format!("{points} points expired"),
            ));

            metrics::counter!("loyalty.points_expired").increment(points);
            info!(owner_id = %owner_id, points = points, "Points expired");
            self.events.emit(LoyaltyEvent::PointsExpired {
                owner_id: owner_id.to_string(),
                points,
            });

            points
        })
    }

    /// Current standing for an account, created lazily if absent.
    pub fn status(&self, owner_id: &str) -> LoyaltyStatus {
        self.store.with(owner_id, |rec| {
            if rec.account.tier_name.is_none() {
                self.recompute_tier(&mut rec.account);
            }
            let account = &rec.account;
            let discount_pct = account
                .tier_name
                .as_deref()
                .and_then(|name| self.catalog.by_name(name))
                .map(|t| t.discount_pct)
                .unwrap_or(0.0);
            let next = self.catalog.next_tier_after(account.lifetime_earned);

            LoyaltyStatus {
                owner_id: account.owner_id.clone(),
                balance: account.balance,
                lifetime_earned: account.lifetime_earned,
                lifetime_redeemed: account.lifetime_redeemed,
                tier_name: account.tier_name.clone(),
                discount_pct,
                next_tier_name: next.map(|t| t.name.clone()),
                points_to_next_tier: next
                    .map(|t| t.min_points.saturating_sub(account.lifetime_earned))
                    .unwrap_or(0),
            }
        })
    }

    /// Ledger history, newest entry first.
    pub fn history(&self, owner_id: &str, limit: usize) -> Vec<LedgerEntry> {
        let mut entries = self.store.ledger(owner_id);
        entries.truncate(limit);
        entries
    }

    /// Snapshot of an account, if one has been created.
    pub fn account(&self, owner_id: &str) -> Option<LoyaltyAccount> {
        self.store.account(owner_id)
    }

    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    /// Re-resolve the tier from `lifetime_earned`. Keeps the current tier
    /// when no catalog tier matches (empty or gapped catalog). Returns true
    /// on change.
    fn recompute_tier(&self, account: &mut LoyaltyAccount) -> bool {
        let Some(tier) = self.catalog.tier_for(account.lifetime_earned) else {
            return false;
        };
        if account.tier_name.as_deref() == Some(tier.name.as_str()) {
            return false;
        }

        let old = account.tier_name.take();
        account.tier_name = Some(tier.name.clone());
        account.tier_updated_at = Some(Utc::now());

        let old_rank = old.as_deref().and_then(|n| self.catalog.rank_of(n));
        let new_rank = self.catalog.rank_of(&tier.name);
        if old_rank.is_none() || new_rank > old_rank {
            metrics::counter!("loyalty.tier_upgrades").increment(1);
        } else {
            metrics::counter!("loyalty.tier_downgrades").increment(1);
        }
        info!(
            owner_id = %account.owner_id,
            from = ?old,
            to = %tier.name,
            "Tier changed"
        );
        self.events.emit(LoyaltyEvent::TierChanged {
            owner_id: account.owner_id.clone(),
            from: old,
            to: tier.name.clone(),
        });
        true
    }
}
