use dotenv::dotenv;
use event_plan_builder::*;
use std::error::Error;
use std::result::Result;
use std::io::{self, Write};
use tokio::sync::mpsc;

fn ask(label: &str, default: &str) -> io::Result<String> {
    print!("{} [{}]: ", label, default);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim();

    Ok(if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    })
}

fn ask_number<T: std::str::FromStr>(label: &str, default: &str) -> Result<T, Box<dyn Error>> {
    let raw = ask(label, default)?;
    raw.parse::<T>()
        .map_err(|_| format!("'{}' is not a valid number for {}", raw, label).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let config = PlannerConfig::from_env_required()?;
    println!("🎉 Event planner using {}\n", config.model);

    let event_type = ask("Event type", "Wedding")?;
    let total_budget: u64 = ask_number("Total budget (INR)", "500000")?;
    let guest_count: u32 = ask_number("Number of guests", "200")?;
    let veg_count: u32 = ask_number("Vegetarian guests", "120")?;
    let nonveg_count: u32 = ask_number("Non-vegetarian guests", "80")?;

    let request = EventRequest::new(event_type, total_budget, guest_count)
        .with_diet_split(veg_count, nonveg_count);
    if let Some(diff) = request.guest_split_mismatch() {
        println!("⚠️  Guest split differs from the guest count by {}", diff);
    }

    let planner = EventPlanner::from_config(config);

    println!("\n🎨 Generating themes...");
    let proposal = planner.propose_themes(&request).await;
    if let Some(error) = &proposal.error {
        println!("⚠️  {}", error);
    }
    for (i, theme) in proposal.themes.iter().enumerate() {
        println!("{}. {}\n   {}\n   {}", i + 1, theme.name, theme.description, theme.aesthetic);
    }

    let theme_index: usize = ask_number("\nPick a theme", "1")?;

    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PlanningEvent::ThemeSelected { name, .. } => println!("✅ Theme: {}", name),
                PlanningEvent::BudgetAllocated { food, entertainment, decorations, .. } => println!(
                    "💰 Food {} | Entertainment {} | Decorations {}",
                    food, entertainment, decorations
                ),
                PlanningEvent::KeywordsChosen { keywords, .. } => {
                    println!("🔎 Searching for: {}", keywords.join(", "))
                }
                PlanningEvent::ProductsFetched { keyword, items, error } => match error {
                    Some(e) => println!("   ❌ {}: {}", keyword, e),
                    None => println!("   ✅ {}: {} products", keyword, items),
                },
                PlanningEvent::Completed { errors } => println!("🏁 Done with {} issue(s)\n", errors),
                PlanningEvent::ThemesProposed { .. } => {}
            }
        }
    });

    let plan = planner
        .plan_with_progress(request, &proposal, theme_index, Some(&tx))
        .await;
    drop(tx);
    printer.await?;

    let report = PlanReport::from_plan(&plan);
    println!("{}", report.to_markdown());

    std::fs::write("event_plan.json", plan.to_json()?)?;
    std::fs::write("event_budget.csv", report.to_csv())?;
    println!("💾 Saved event_plan.json and event_budget.csv");

    Ok(())
}
