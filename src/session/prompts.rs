use serde_json::{json, Value};

use crate::catalog::CatalogItem;

/// System instruction, with the current selection appended when there is one.
/// Descriptions are left out here to keep every request small.
pub fn system_instruction(base: &str, selection: &[CatalogItem]) -> String {
    if selection.is_empty() {
        return base.to_string();
    }

    let mut prompt = String::from(base);
    prompt.push_str("\n\nThe user currently has these products selected:\n");
    for item in selection {
        prompt.push_str(&format!("- {} by {} ({})\n", item.name, item.brand, item.category));
    }
    prompt.push_str("Refer to them when relevant.");
    prompt
}

/// Structured request for a personalized routine built from the selection
pub fn routine_prompt(selection: &[CatalogItem]) -> String {
    let products: Vec<Value> = selection
        .iter()
        .map(|item| {
            json!({
                "name": item.name,
                "brand": item.brand,
                "category": item.category,
                "description": item.description,
            })
        })
        .collect();

    format!(
        "Create a personalized routine using these products: {}.\n\n\
         Please provide:\n\
         1. A step-by-step routine (AM/PM if applicable)\n\
         2. How to use each product\n\
         3. Tips for best results\n\
         4. Any important application order\n\n\
         Make it friendly and easy to follow!",
        Value::Array(products)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductId;

    fn cleanser() -> CatalogItem {
        CatalogItem {
            id: ProductId::Number(1),
            name: "Hydrating Cleanser".into(),
            brand: "X".into(),
            category: "skincare".into(),
            description: "A gentle, non-foaming cleanser with ceramides".into(),
            image: "img/cleanser.jpg".into(),
        }
    }

    #[test]
    fn test_system_instruction_without_selection() {
        assert_eq!(system_instruction("base", &[]), "base");
    }

    #[test]
    fn test_system_instruction_lists_selection_without_descriptions() {
        let prompt = system_instruction("base", &[cleanser()]);
        assert!(prompt.starts_with("base"));
        assert!(prompt.contains("- Hydrating Cleanser by X (skincare)"));
        assert!(!prompt.contains("ceramides"));
        assert!(!prompt.contains("img/cleanser.jpg"));
    }

    #[test]
    fn test_routine_prompt_contents() {
        let prompt = routine_prompt(&[cleanser()]);
        assert!(prompt.contains("Hydrating Cleanser"));
        assert!(prompt.contains("ceramides"));
        assert!(prompt.contains("AM/PM"));
        assert!(prompt.contains("application order"));
        assert!(!prompt.contains("img/cleanser.jpg"));
    }

    #[test]
    fn test_routine_prompt_embeds_product_json() {
        let prompt = routine_prompt(&[cleanser()]);
        let start = prompt.find('[').unwrap();
        let end = prompt.rfind(']').unwrap();
        let products: Value = serde_json::from_str(&prompt[start..=end]).unwrap();
        assert_eq!(products[0]["brand"], "X");
        assert_eq!(products[0]["category"], "skincare");
        assert!(products[0].get("image").is_none());
    }
}
