// Prompt templates for the three planning stages

use crate::guidelines::AllocationGuidelines;
use crate::schema::{EventDetails, EventRequest, Theme};

pub fn theme_prompt(request: &EventRequest) -> String {
    format!(
        r#"
You are an intelligent event planner AI.

User is organizing an event. Below are the event details:
- Event Type: {event_type}
- Total Budget: {total_budget} {currency}
- Total Guests: {guest_count}
- Veg Guests: {veg_count}
- Non-Veg Guests: {nonveg_count}

TASK: Suggest 3 unique and creative **themes** for {event_type}. Each theme should include:
1. Name - the theme name
2. Description - a short description
3. Aesthetic/Visual Style - colours, materials and overall look

Return the themes as a JSON list in exactly this shape:
```json
[
  {{
    "Name": "",
    "Description": "",
    "Aesthetic/Visual Style": ""
  }},
  {{
    "Name": "",
    "Description": "",
    "Aesthetic/Visual Style": ""
  }},
  {{
    "Name": "",
    "Description": "",
    "Aesthetic/Visual Style": ""
  }}
]
```

Keep it realistic and make sure the themes are budget-conscious for the input above.
"#,
        event_type = request.event_type,
        total_budget = request.total_budget,
        currency = request.currency,
        guest_count = request.guest_count,
        veg_count = request.veg_count,
        nonveg_count = request.nonveg_count,
    )
}

pub fn budget_prompt(details: &EventDetails, guidelines: &AllocationGuidelines) -> String {
    let request = &details.request;
    let (theme_name, theme_description, theme_aesthetic) = theme_fields(&details.theme);
    let food_per_guest = request
        .food_budget_per_guest
        .map(|amount| {
            format!(
                "\n- Planned Food Spend per Guest: {} {}",
                amount, request.currency
            )
        })
        .unwrap_or_default();

    format!(
        r#"
You are an expert event planner with knowledge of Indian wedding and event costs. Given the following event details and budget guidelines, allocate the total budget across three categories: food, entertainment, and decorations.

Event Details:
- Event Type: {event_type}
- Total Budget: {total_budget} {currency}
- Number of Guests: {guest_count} (Vegetarian: {veg_count}, Non-vegetarian: {nonveg_count}){food_per_guest}
- Theme: {theme_name}
- Theme Description: {theme_description}
- Theme Aesthetic: {theme_aesthetic}

Budget Allocation Guidelines for {event_type}:
- Food should typically be around {food_ratio} of the total budget
- Entertainment should typically be around {entertainment_ratio} of the total budget
- Decorations should typically be around {decorations_ratio} of the total budget

Important Considerations:
1. For food, calculate based on the number of vegetarian and non-vegetarian guests.
2. For a theme like "{theme_name}", adjust the decoration and entertainment allocations to best achieve the aesthetic described.
3. The sum of all allocations must exactly equal the total budget of {total_budget} {currency}.
4. Round all amounts to whole numbers.

Return a JSON object with the following structure:
{{
  "food": allocated_amount_for_food,
  "entertainment": allocated_amount_for_entertainment,
  "decorations": allocated_amount_for_decorations,
  "total": total_budget,
  "reasoning": "detailed explanation of your allocation decisions, including theme considerations"
}}
"#,
        event_type = request.event_type,
        total_budget = request.total_budget,
        currency = request.currency,
        guest_count = request.guest_count,
        veg_count = request.veg_count,
        nonveg_count = request.nonveg_count,
        food_per_guest = food_per_guest,
        theme_name = theme_name,
        theme_description = theme_description,
        theme_aesthetic = theme_aesthetic,
        food_ratio = guidelines.food,
        entertainment_ratio = guidelines.entertainment,
        decorations_ratio = guidelines.decorations,
    )
}

pub fn decoration_prompt(details: &EventDetails, decorations_budget: i64) -> String {
    let request = &details.request;
    let (theme_name, theme_description, visual_style) = theme_fields(&details.theme);

    format!(
        r#"
You are an expert {event_type} planner.
Suggest 3 main decoration product search keywords for an online marketplace. The products should be easy to find.

Event: {event_type}
Theme: {theme_name}
Theme Description: {theme_description}
Visual Style: {visual_style}
Total Budget: {decorations_budget} {currency}
Divide {decorations_budget} by 3; that is the maximum price for each product keyword you generate.

Return ONLY a JSON list like ["keyword1", "keyword2", "keyword3", amount_per_product, total_amount]
"#,
        event_type = request.event_type,
        theme_name = theme_name,
        theme_description = theme_description,
        visual_style = visual_style,
        decorations_budget = decorations_budget,
        currency = request.currency,
    )
}

/// Name, description and aesthetic for a prompt. Blank fields and the
/// placeholder theme fall back to a classic concept.
fn theme_fields(theme: &Theme) -> (&str, &str, &str) {
    if theme.is_placeholder() {
        return ("Classic", "A traditional event", "Elegant and simple");
    }
    (
        non_blank(&theme.name, "Classic"),
        non_blank(&theme.description, "A traditional event"),
        non_blank(&theme.aesthetic, "Elegant and simple"),
    )
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EventKind;

    fn details() -> EventDetails {
        EventDetails {
            request: EventRequest::new("Birthday Party", 100_000, 100)
                .with_diet_split(60, 40)
                .with_food_budget_per_guest(200),
            theme: Theme::new("Retro Arcade", "80s games night", "Neon pink and blue"),
        }
    }

    #[test]
    fn test_theme_prompt_interpolates_request() {
        let prompt = theme_prompt(&details().request);
        assert!(prompt.contains("- Event Type: Birthday Party"));
        assert!(prompt.contains("- Total Budget: 100000 INR"));
        assert!(prompt.contains("\"Aesthetic/Visual Style\": \"\""));
    }

    #[test]
    fn test_budget_prompt_includes_guidelines() {
        let guidelines = AllocationGuidelines::for_kind(EventKind::Birthday);
        let prompt = budget_prompt(&details(), &guidelines);
        assert!(prompt.contains("Food should typically be around 35-45%"));
        assert!(prompt.contains("Planned Food Spend per Guest: 200 INR"));
        assert!(prompt.contains("For a theme like \"Retro Arcade\""));
        assert!(prompt.contains("\"total\": total_budget"));
    }

    #[test]
    fn test_empty_theme_fields_use_fallbacks() {
        let mut d = details();
        d.theme = Theme::default();
        let prompt = decoration_prompt(&d, 30_000);
        assert!(prompt.contains("Theme: Classic"));
        assert!(prompt.contains("Total Budget: 30000 INR"));
    }

    #[test]
    fn test_placeholder_theme_is_not_sent_to_model() {
        let mut d = details();
        d.theme = Theme::placeholder();
        let prompt = budget_prompt(&d, &AllocationGuidelines::for_kind(EventKind::Other));
        assert!(prompt.contains("- Theme: Classic"));
        assert!(!prompt.contains("missing"));
    }
}
