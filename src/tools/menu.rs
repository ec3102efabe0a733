//! Restaurant menu tools used by the function-calling samples.

use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tools::ToolSpec;

pub const GET_SPECIALS: &str = "GetSpecials";
pub const GET_ITEM_PRICE: &str = "GetItemPrice";

const SPECIALS: &[(&str, &str)] = &[
    ("Soup", "Clam Chowder"),
    ("Salad", "Cobb Salad"),
    ("Drink", "Chai Tea"),
];

const PRICES: &[(&str, &str)] = &[
    ("clam chowder", "$9.99"),
    ("cobb salad", "$9.99"),
    ("chai tea", "$9.99"),
    ("house salad", "$7.49"),
    ("tomato soup", "$5.99"),
];

pub fn specials_text() -> String {
    SPECIALS
        .iter()
        .map(|(course, item)| format!("Special {course}: {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn item_price(menu_item: &str) -> Option<&'static str> {
    let wanted = menu_item.trim().to_lowercase();
    PRICES
        .iter()
        .find(|(item, _)| *item == wanted)
        .map(|(_, price)| *price)
}

pub fn get_specials() -> ToolSpec {
    ToolSpec::new(GET_SPECIALS, "Provides a list of specials from the menu.")
        .with_schema(json!({
            "type": "object",
            "properties": {},
            "required": [],
            "additionalProperties": false
        }))
        .expect("valid schema")
        .with_handler(|_args| async move { Ok(specials_text()) })
}

pub fn get_item_price() -> ToolSpec {
    ToolSpec::new(GET_ITEM_PRICE, "Provides the price of the requested menu item.")
        .with_schema(json!({
            "type": "object",
            "properties": {
                "menuItem": {
                    "type": "string",
                    "description": "The name of the menu item."
                }
            },
            "required": ["menuItem"],
            "additionalProperties": false
        }))
        .expect("valid schema")
        .with_handler(|args: Value| async move {
            let item = args
                .get("menuItem")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::Execution("menuItem missing".to_string()))?;
            item_price(item)
                .map(str::to_string)
                .ok_or_else(|| ToolError::Execution(format!("'{item}' is not on the menu")))
        })
}

pub fn menu_tools() -> Vec<ToolSpec> {
    vec![get_specials(), get_item_price()]
}
