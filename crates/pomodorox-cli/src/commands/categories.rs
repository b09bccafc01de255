use pomodorox_core::category::{PREDEFINED_CATEGORIES, QUICK_LABELS};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(PREDEFINED_CATEGORIES)?);
        return Ok(());
    }
    for category in PREDEFINED_CATEGORIES {
        println!("{} {:<14} {}", category.icon, category.id, category.name);
    }
    println!();
    println!("Quick labels: {}", QUICK_LABELS.join(", "));
    Ok(())
}
