//! Quest catalog: immutable templates and instance generation.
//!
//! Instances are deep copies. Coin and xp rewards are scaled by the rarity
//! multiplier (floored), and selected objective kinds get bounded random
//! target variance so repeated assignments of the same template don't feel
//! identical.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use uuid::Uuid;

use crate::farm::errors::FarmError;
use crate::farm::types::{
    ObjectiveKind, ObjectiveProgress, QuestCategory, QuestInstance, QuestStatus, QuestTemplate,
    RewardBundle,
};

/// Variance bounds per objective kind: (fraction, minimum target).
/// Plant counts swing ±20% with a floor of 1; coin-earn targets swing ±30%
/// with a floor of 10. Everything else is taken verbatim.
fn variance_for(kind: ObjectiveKind) -> Option<(f64, u64)> {
    match kind {
        ObjectiveKind::Plant => Some((0.20, 1)),
        ObjectiveKind::EarnCoins => Some((0.30, 10)),
        _ => None,
    }
}

/// Process-wide registry of immutable quest templates.
#[derive(Default)]
pub struct QuestCatalog {
    templates: HashMap<String, QuestTemplate>,
}

impl QuestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: QuestTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, template_id: &str) -> Result<&QuestTemplate, FarmError> {
        self.templates
            .get(template_id)
            .ok_or_else(|| FarmError::UnknownTemplate(template_id.to_string()))
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.templates.contains_key(template_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates tagged for a cadence, in stable id order so reassignment
    /// passes are deterministic.
    pub fn templates_for(&self, category: QuestCategory) -> Vec<&QuestTemplate> {
        let mut templates: Vec<&QuestTemplate> = self
            .templates
            .values()
            .filter(|t| t.category == category)
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Build a fresh instance from a template: deep-copied objectives with
    /// randomized targets, rarity-scaled rewards, resolved description.
    pub fn create_instance<R: Rng + ?Sized>(
        &self,
        template_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<QuestInstance, FarmError> {
        let template = self.get(template_id)?;

        let objectives: Vec<ObjectiveProgress> = template
            .objectives
            .iter()
            .map(|spec| {
                let target = match variance_for(spec.kind) {
                    Some((fraction, floor)) => {
                        let spread = (spec.target as f64 * fraction).round() as i64;
                        let base = spec.target as i64;
                        let rolled = if spread > 0 {
                            rng.gen_range(base - spread..=base + spread)
                        } else {
                            base
                        };
                        (rolled.max(floor as i64)) as u64
                    }
                    None => spec.target,
                };
                ObjectiveProgress::from_spec(spec, target)
            })
            .collect();

        let multiplier = template.rarity.reward_multiplier();
        let rewards = RewardBundle {
            coins: (template.rewards.coins as f64 * multiplier).floor() as u64,
            experience: (template.rewards.experience as f64 * multiplier).floor() as u64,
            items: template.rewards.items.clone(),
        };

        let first_target = objectives.first().map(|o| o.target).unwrap_or(0);
        let description = template
            .description
            .replace("{target}", &first_target.to_string());

        Ok(QuestInstance {
            instance_id: Uuid::new_v4(),
            template_id: template.id.clone(),
            name: template.name.clone(),
            description,
            category: template.category,
            rarity: template.rarity,
            objectives,
            rewards,
            status: QuestStatus::Active,
            started_at: now,
            ends_at: template
                .time_limit_secs
                .map(|secs| now + Duration::seconds(secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::farm::types::{ObjectiveSpec, QuestRarity};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn catalog_with(template: QuestTemplate) -> QuestCatalog {
        let mut catalog = QuestCatalog::new();
        catalog.insert(template);
        catalog
    }

    #[test]
    fn unknown_template_is_an_error() {
        let catalog = QuestCatalog::new();
        assert!(matches!(
            catalog.create_instance("nope", Utc::now(), &mut rng()),
            Err(FarmError::UnknownTemplate(id)) if id == "nope"
        ));
    }

    #[test]
    fn plant_targets_vary_within_twenty_percent() {
        let catalog = catalog_with(
            QuestTemplate::new("daily_plant", "Green Thumb", "Plant {target} seeds", QuestCategory::Daily)
                .with_objective(ObjectiveSpec::new("Plant seeds", ObjectiveKind::Plant, 100)),
        );
        let mut rng = rng();
        for _ in 0..50 {
            let instance = catalog.create_instance("daily_plant", Utc::now(), &mut rng).unwrap();
            let target = instance.objectives[0].target;
            assert!((80..=120).contains(&target), "target {} out of bounds", target);
        }
    }

    #[test]
    fn earn_targets_vary_within_thirty_percent_with_floor() {
        let catalog = catalog_with(
            QuestTemplate::new("daily_earn", "Coin Collector", "Earn {target} coins", QuestCategory::Daily)
                .with_objective(ObjectiveSpec::new("Earn coins", ObjectiveKind::EarnCoins, 10)),
        );
        let mut rng = rng();
        for _ in 0..50 {
            let instance = catalog.create_instance("daily_earn", Utc::now(), &mut rng).unwrap();
            let target = instance.objectives[0].target;
            assert!(target >= 10, "floor of 10 violated: {}", target);
            assert!(target <= 13);
        }
    }

    #[test]
    fn non_randomized_kinds_keep_exact_targets() {
        let catalog = catalog_with(
            QuestTemplate::new("weekly_visit", "Socialite", "Visit {target} farms", QuestCategory::Weekly)
                .with_objective(ObjectiveSpec::new("Visit farms", ObjectiveKind::Visit, 5).unique()),
        );
        let instance = catalog
            .create_instance("weekly_visit", Utc::now(), &mut rng())
            .unwrap();
        assert_eq!(instance.objectives[0].target, 5);
        assert!(instance.objectives[0].track_unique);
    }

    #[test]
    fn rarity_multiplier_floors_coin_and_xp_rewards() {
        let catalog = catalog_with(
            QuestTemplate::new("rare_quest", "Rare", "Do the thing", QuestCategory::Weekly)
                .with_rarity(QuestRarity::Uncommon)
                .with_objective(ObjectiveSpec::new("Harvest", ObjectiveKind::Harvest, 3))
                .with_reward_coins(101)
                .with_reward_experience(50)
                .with_reward_item("ribbon", 1),
        );
        let instance = catalog
            .create_instance("rare_quest", Utc::now(), &mut rng())
            .unwrap();
        assert_eq!(instance.rewards.coins, 126, "101 * 1.25 floored");
        assert_eq!(instance.rewards.experience, 62, "50 * 1.25 floored");
        assert_eq!(instance.rewards.items.len(), 1, "items are not multiplied");
    }

    #[test]
    fn description_placeholder_uses_resolved_first_target() {
        let catalog = catalog_with(
            QuestTemplate::new("daily_harvest", "Reaper", "Harvest {target} crops today", QuestCategory::Daily)
                .with_objective(ObjectiveSpec::new("Harvest crops", ObjectiveKind::Harvest, 8)),
        );
        let instance = catalog
            .create_instance("daily_harvest", Utc::now(), &mut rng())
            .unwrap();
        assert_eq!(instance.description, "Harvest 8 crops today");
    }

    #[test]
    fn time_limit_sets_expiry() {
        let catalog = catalog_with(
            QuestTemplate::new("daily_x", "X", "X", QuestCategory::Daily)
                .with_objective(ObjectiveSpec::new("Harvest", ObjectiveKind::Harvest, 1))
                .with_time_limit_secs(86_400),
        );
        let now = Utc::now();
        let instance = catalog.create_instance("daily_x", now, &mut rng()).unwrap();
        assert_eq!(instance.ends_at, Some(now + Duration::seconds(86_400)));
        assert!(!instance.is_expired(now));
        assert!(instance.is_expired(now + Duration::seconds(86_401)));
    }
}
