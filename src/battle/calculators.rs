use schema::{CardTemplate, Element};

/// Damage an attack deals after weakness and resistance.
///
/// Weakness to the attacker's element doubles the base damage. Resistance then
/// subtracts its printed amount. The result never goes below zero.
pub fn calculate_damage(base_damage: u32, attacker_element: Element, defender: &CardTemplate) -> u32 {
    let mut damage = base_damage;
    if defender.weakness_to(attacker_element).is_some() {
        damage = damage.saturating_mul(2);
    }
    if let Some(resistance) = defender.resistance_to(attacker_element) {
        damage = damage.saturating_sub(resistance.reduction());
    }
    damage
}

/// Energy a card must discard to retreat, derived from its max HP.
pub fn retreat_cost(max_hp: u32) -> usize {
    match max_hp {
        150.. => 3,
        101..=149 => 2,
        60..=100 => 1,
        _ => 0,
    }
}

/// Whether `pool` covers an attack costing `cost` for a card of `element`.
///
/// Only energy of the card's own element counts toward the cost.
pub fn can_pay(pool: &[Element], element: Element, cost: usize) -> bool {
    pool.iter().filter(|attached| **attached == element).count() >= cost
}
