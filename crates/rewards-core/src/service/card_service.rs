//! 常客卡引擎
//!
//! 按（客户, 服务项目）维度累计到店次数并管理卡片状态机：
//! Active --集满--> Completed --核销--> Redeemed，过期走 Expired 终态。
//!
//! 过期没有后台任务，全部在读写路径上惰性翻转；核销为存储层 CAS，
//! 并发双核销只有一方成功。

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rewards_shared::config::RewardsConfig;

use crate::error::{Result, RewardsError};
use crate::lock::ScopeLock;
use crate::models::{CardStatus, FrequentCard};
use crate::repository::CardRepository;
use crate::service::dto::{AutoApplyCheck, VisitKind, VisitOutcome};

/// 常客卡策略参数
#[derive(Debug, Clone)]
pub struct CardPolicy {
    /// 集满所需到店次数
    pub required_visits: i32,
    /// 发卡时的有效期（天）
    pub expiry_days: i64,
}

impl Default for CardPolicy {
    fn default() -> Self {
        Self {
            required_visits: 3,
            expiry_days: 180,
        }
    }
}

impl From<&RewardsConfig> for CardPolicy {
    fn from(config: &RewardsConfig) -> Self {
        Self {
            required_visits: config.required_visits,
            expiry_days: config.card_expiry_days,
        }
    }
}

/// 常客卡引擎
pub struct FrequentCardEngine {
    repo: Arc<dyn CardRepository>,
    lock: Arc<ScopeLock>,
    policy: CardPolicy,
}

impl FrequentCardEngine {
    pub fn new(repo: Arc<dyn CardRepository>, lock: Arc<ScopeLock>, policy: CardPolicy) -> Self {
        Self { repo, lock, policy }
    }

    /// 列出客户未关闭的卡片
    ///
    /// 读取前先做惰性过期扫描：已过失效日期的 Active/Completed 卡
    /// 被翻转为 Expired（幂等，重复读取不会再次触发副作用）。
    #[instrument(skip(self))]
    pub async fn list_cards(
        &self,
        customer_id: &str,
        company_id: Option<&str>,
    ) -> Result<Vec<FrequentCard>> {
        let today = Utc::now().date_naive();
        let flipped = self.repo.expire_overdue(customer_id, today).await?;
        if flipped > 0 {
            info!(customer_id = %customer_id, flipped = flipped, "常客卡惰性过期扫描完成");
        }

        self.repo
            .list_open(customer_id, company_id.map(String::from))
            .await
    }

    /// 记录一次到店
    ///
    /// 有未关闭、未过期卡片时计数 +1（达标则翻转为 Completed）；
    /// 没有则新开一张卡。已集满待核销的卡不受本次到店影响（no-op），
    /// 新周期只在旧卡核销或过期后开始。
    #[instrument(skip(self), fields(customer_id = %customer_id, service_id = %service_id))]
    pub async fn record_visit(
        &self,
        customer_id: &str,
        service_id: &str,
        company_id: Option<&str>,
    ) -> Result<VisitOutcome> {
        let _guard = self
            .lock
            .acquire(&ScopeLock::card_key(customer_id, service_id))
            .await;

        let today = Utc::now().date_naive();
        let existing = self
            .repo
            .latest_open_for_service(customer_id, service_id, today)
            .await?;

        match existing {
            Some(card) if card.status == CardStatus::Completed => {
                info!(card_id = %card.id, "卡片已集满待核销，本次到店不计数");
                Ok(VisitOutcome {
                    card,
                    kind: VisitKind::AlreadyCompleted,
                })
            }
            Some(card) => match self.repo.advance_visit(card.id).await? {
                Some(updated) => {
                    let kind = if updated.status == CardStatus::Completed {
                        VisitKind::Completed
                    } else {
                        VisitKind::Advanced
                    };
                    info!(
                        card_id = %updated.id,
                        visits = updated.visits,
                        required = updated.required_visits,
                        "到店计数已累计"
                    );
                    Ok(VisitOutcome {
                        card: updated,
                        kind,
                    })
                }
                // 锁外路径（如过期扫描）抢先关闭了卡片，回退为新开卡
                None => {
                    warn!(card_id = %card.id, "卡片在计数前被关闭，改为新开卡");
                    self.open_card(customer_id, service_id, company_id, today)
                        .await
                }
            },
            None => {
                self.open_card(customer_id, service_id, company_id, today)
                    .await
            }
        }
    }

    /// 核销一张已集满卡片的免费服务
    ///
    /// 校验顺序：存在性 -> 归属 -> 过期 -> 重复核销 -> 次数达标，
    /// 最终的 Completed -> Redeemed 翻转由存储层 CAS 保证至多发生一次。
    #[instrument(skip(self), fields(card_id = %card_id, customer_id = %customer_id))]
    pub async fn apply_free_service(
        &self,
        card_id: Uuid,
        customer_id: &str,
        service_id: &str,
    ) -> Result<FrequentCard> {
        let card = self
            .repo
            .get(card_id)
            .await?
            .ok_or(RewardsError::CardNotFound(card_id))?;

        if card.customer_id != customer_id || card.service_id != service_id {
            return Err(RewardsError::CardMismatch(card_id));
        }
        if card.status == CardStatus::Expired {
            return Err(RewardsError::CardExpired(card_id));
        }
        if card.status == CardStatus::Redeemed {
            return Err(RewardsError::AlreadyRedeemed(card_id));
        }

        // 状态未翻转但日期已过：先落地过期再拒绝。
        // 过期判定先于次数判定，未集满的过期卡报 CardExpired 而非 NotEligible。
        let today = Utc::now().date_naive();
        if card.is_expired(today) {
            self.repo.expire_overdue(customer_id, today).await?;
            return Err(RewardsError::CardExpired(card_id));
        }

        if card.visits < card.required_visits {
            return Err(RewardsError::NotEligible {
                visits: card.visits,
                required: card.required_visits,
            });
        }

        match self.repo.redeem_completed(card_id, Utc::now()).await? {
            Some(redeemed) => {
                info!(card_id = %card_id, customer_id = %customer_id, "免费服务核销成功");
                Ok(redeemed)
            }
            // CAS 落败：按卡片当前状态给出准确的失败原因
            None => match self.repo.get(card_id).await? {
                Some(now) if now.status == CardStatus::Redeemed => {
                    Err(RewardsError::AlreadyRedeemed(card_id))
                }
                Some(now) if now.status == CardStatus::Expired => {
                    Err(RewardsError::CardExpired(card_id))
                }
                Some(now) => Err(RewardsError::NotEligible {
                    visits: now.visits,
                    required: now.required_visits,
                }),
                None => Err(RewardsError::CardNotFound(card_id)),
            },
        }
    }

    /// 探测是否有可自动核销的卡片（只读，不产生任何状态变化）
    ///
    /// 返回最早创建的已集满、未过期、未核销卡片，收银端据此提示。
    #[instrument(skip(self))]
    pub async fn check_auto_apply(
        &self,
        customer_id: &str,
        service_id: &str,
    ) -> Result<AutoApplyCheck> {
        let today = Utc::now().date_naive();
        let card = self
            .repo
            .oldest_completed_for_service(customer_id, service_id, today)
            .await?;

        Ok(match card {
            Some(card) if card.visits >= card.required_visits => AutoApplyCheck::eligible(card.id),
            _ => AutoApplyCheck::not_eligible(),
        })
    }

    // ==================== 私有方法 ====================

    /// 新开一张卡（本次到店计为第 1 次）
    async fn open_card(
        &self,
        customer_id: &str,
        service_id: &str,
        company_id: Option<&str>,
        today: NaiveDate,
    ) -> Result<VisitOutcome> {
        let required = self.policy.required_visits.max(1);
        let completed_at_once = required == 1;

        let card = FrequentCard {
            id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            service_id: service_id.to_string(),
            company_id: company_id.map(String::from),
            visits: 1,
            required_visits: required,
            issue_date: today,
            expiry_date: expiry_from(today, self.policy.expiry_days),
            status: if completed_at_once {
                CardStatus::Completed
            } else {
                CardStatus::Active
            },
            redeemed_at: None,
            created_at: Utc::now(),
        };
        self.repo.insert(&card).await?;

        info!(
            card_id = %card.id,
            customer_id = %customer_id,
            service_id = %service_id,
            required = required,
            "新开常客卡"
        );

        Ok(VisitOutcome {
            kind: if completed_at_once {
                VisitKind::Completed
            } else {
                VisitKind::Created
            },
            card,
        })
    }
}

fn expiry_from(today: NaiveDate, days: i64) -> NaiveDate {
    u64::try_from(days)
        .ok()
        .and_then(|d| today.checked_add_days(Days::new(d)))
        .unwrap_or(today)
}
