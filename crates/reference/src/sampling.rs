use rand::Rng;
use serde_json::Value;

pub const RARITY_WEIGHT_KEY: &str = "rarityWeight";

/// Weight of an item for random selection: missing or non-numeric is 1,
/// negative is 0, fractions are truncated.
pub fn rarity_weight(item: &Value) -> u64 {
    match item.get(RARITY_WEIGHT_KEY) {
        Some(Value::Number(n)) => {
            if let Some(weight) = n.as_u64() {
                weight
            } else if n.as_i64().is_some() {
                0
            } else {
                n.as_f64().map_or(1, |w| if w <= 0.0 { 0 } else { w as u64 })
            }
        }
        _ => 1,
    }
}

/// Pick one item with probability proportional to its rarity weight.
///
/// A single item is returned without drawing from `rng`. When every weight
/// is zero the pick is uniform.
pub fn weighted_pick<'a, R>(items: &'a [Value], rng: &mut R) -> Option<&'a Value>
where
    R: Rng + ?Sized,
{
    match items {
        [] => None,
        [only] => Some(only),
        _ => {
            let total = items
                .iter()
                .map(rarity_weight)
                .fold(0u64, u64::saturating_add);
            if total == 0 {
                return items.get(rng.gen_range(0..items.len()));
            }
            let mut roll = rng.gen_range(0..total);
            for item in items {
                let weight = rarity_weight(item);
                if roll < weight {
                    return Some(item);
                }
                roll -= weight;
            }
            items.last()
        }
    }
}
