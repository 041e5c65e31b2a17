//! Seed content: built-in starter templates plus JSON loaders so operators
//! can reskin the quest board and price sheet without recompiling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::farm::errors::FarmError;
use crate::farm::hooks::StaticPriceTable;
use crate::farm::types::{ObjectiveKind, ObjectiveSpec, QuestCategory, QuestRarity, QuestTemplate};

/// Built-in quest board: a daily rotation, two weeklies, and a three-step
/// story chain gated by prerequisites.
pub fn starter_quest_templates() -> Vec<QuestTemplate> {
    let mut templates = Vec::new();

    templates.push(
        QuestTemplate::new(
            "daily_plant_seeds",
            "Green Thumb",
            "Plant {target} seeds in your plots.",
            QuestCategory::Daily,
        )
        .with_objective(ObjectiveSpec::new("Plant seeds", ObjectiveKind::Plant, 20))
        .with_reward_coins(75)
        .with_reward_experience(30)
        .with_time_limit_secs(86_400),
    );

    templates.push(
        QuestTemplate::new(
            "daily_harvest_crops",
            "Morning Harvest",
            "Harvest {target} crops before they wilt.",
            QuestCategory::Daily,
        )
        .with_objective(ObjectiveSpec::new("Harvest crops", ObjectiveKind::Harvest, 15))
        .with_reward_coins(60)
        .with_reward_experience(25)
        .with_time_limit_secs(86_400),
    );

    templates.push(
        QuestTemplate::new(
            "daily_earn_coins",
            "Market Day",
            "Earn {target} coins from sales.",
            QuestCategory::Daily,
        )
        .with_rarity(QuestRarity::Uncommon)
        .with_objective(ObjectiveSpec::new("Earn coins", ObjectiveKind::EarnCoins, 200))
        .with_reward_coins(100)
        .with_reward_experience(40)
        .with_time_limit_secs(86_400),
    );

    templates.push(
        QuestTemplate::new(
            "weekly_social_butterfly",
            "Social Butterfly",
            "Visit {target} different friends' farms this week.",
            QuestCategory::Weekly,
        )
        .with_rarity(QuestRarity::Rare)
        .with_objective(ObjectiveSpec::new("Visit farms", ObjectiveKind::Visit, 5).unique())
        .with_reward_coins(300)
        .with_reward_experience(120)
        .with_reward_item("friendship_wreath", 1)
        .with_time_limit_secs(604_800),
    );

    templates.push(
        QuestTemplate::new(
            "weekly_master_farmer",
            "Master Farmer",
            "Harvest {target} crops over the week.",
            QuestCategory::Weekly,
        )
        .with_rarity(QuestRarity::Rare)
        .with_objective(ObjectiveSpec::new("Harvest crops", ObjectiveKind::Harvest, 100))
        .with_objective(ObjectiveSpec::new("Reach a new level", ObjectiveKind::ReachLevel, 1))
        .with_reward_coins(450)
        .with_reward_experience(200)
        .with_time_limit_secs(604_800),
    );

    // Story chain: each step unlocks when the previous one completes.
    templates.push(
        QuestTemplate::new(
            "story_first_sprout",
            "First Sprout",
            "Plant your first {target} seeds and watch them grow.",
            QuestCategory::Story,
        )
        .with_objective(ObjectiveSpec::new("Plant seeds", ObjectiveKind::Plant, 5))
        .with_reward_coins(50)
        .with_reward_experience(20),
    );

    templates.push(
        QuestTemplate::new(
            "story_first_sale",
            "First Sale",
            "Harvest your crops and earn {target} coins at market.",
            QuestCategory::Story,
        )
        .with_objective(ObjectiveSpec::new("Harvest crops", ObjectiveKind::Harvest, 5))
        .with_objective(ObjectiveSpec::new("Earn coins", ObjectiveKind::EarnCoins, 50))
        .with_prerequisite("story_first_sprout")
        .with_reward_coins(120)
        .with_reward_experience(50)
        .with_reward_item("wooden_sign", 1),
    );

    templates.push(
        QuestTemplate::new(
            "story_good_neighbor",
            "Good Neighbor",
            "Visit {target} neighboring farms and lend a hand.",
            QuestCategory::Story,
        )
        .with_rarity(QuestRarity::Epic)
        .with_objective(ObjectiveSpec::new("Visit farms", ObjectiveKind::Visit, 3).unique())
        .with_objective(ObjectiveSpec::new("Social interactions", ObjectiveKind::Social, 5))
        .with_prerequisite("story_first_sale")
        .with_reward_coins(500)
        .with_reward_experience(250)
        .with_reward_item("golden_trowel", 1),
    );

    templates
}

/// Built-in sell prices for the starter crop set.
pub fn default_sell_prices() -> StaticPriceTable {
    StaticPriceTable::new()
        .with_sell_price("carrot", 12)
        .with_sell_price("potato", 10)
        .with_sell_price("tomato", 18)
        .with_sell_price("strawberry", 25)
        .with_sell_price("pumpkin", 40)
        .with_sell_price("sunflower", 35)
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectiveSeed {
    description: String,
    kind: ObjectiveKind,
    target: u64,
    #[serde(default)]
    track_unique: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplateSeed {
    id: String,
    name: String,
    description: String,
    category: QuestCategory,
    #[serde(default)]
    rarity: Option<QuestRarity>,
    objectives: Vec<ObjectiveSeed>,
    #[serde(default)]
    reward_coins: u64,
    #[serde(default)]
    reward_experience: u64,
    #[serde(default)]
    reward_items: Vec<(String, u32)>,
    #[serde(default)]
    time_limit_secs: Option<i64>,
    #[serde(default)]
    prerequisite: Option<String>,
}

fn parse_error(path: &Path, err: serde_json::Error) -> FarmError {
    FarmError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("failed to parse {}: {}", path.display(), err),
    ))
}

/// Load quest templates from a JSON array (see `TemplateSeed` for the shape).
pub fn load_templates_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<QuestTemplate>, FarmError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<TemplateSeed> =
        serde_json::from_str(&contents).map_err(|e| parse_error(path, e))?;

    let templates = seeds
        .into_iter()
        .map(|seed| {
            let mut template =
                QuestTemplate::new(&seed.id, &seed.name, &seed.description, seed.category);
            if let Some(rarity) = seed.rarity {
                template = template.with_rarity(rarity);
            }
            for objective in seed.objectives {
                let mut spec =
                    ObjectiveSpec::new(&objective.description, objective.kind, objective.target);
                if objective.track_unique {
                    spec = spec.unique();
                }
                template = template.with_objective(spec);
            }
            if seed.reward_coins > 0 {
                template = template.with_reward_coins(seed.reward_coins);
            }
            if seed.reward_experience > 0 {
                template = template.with_reward_experience(seed.reward_experience);
            }
            for (item_id, quantity) in seed.reward_items {
                template = template.with_reward_item(&item_id, quantity);
            }
            if let Some(secs) = seed.time_limit_secs {
                template = template.with_time_limit_secs(secs);
            }
            if let Some(prereq) = seed.prerequisite {
                template = template.with_prerequisite(&prereq);
            }
            template
        })
        .collect();

    Ok(templates)
}

/// Load the sell price sheet from a JSON object of `item_id -> price`.
pub fn load_sell_prices_from_json<P: AsRef<Path>>(path: P) -> Result<StaticPriceTable, FarmError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let prices: HashMap<String, u64> =
        serde_json::from_str(&contents).map_err(|e| parse_error(path, e))?;
    Ok(StaticPriceTable::from_sell_prices(prices))
}
