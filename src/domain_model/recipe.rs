use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId(id.to_owned())
    }
}

/// Status document of a generation job.
///
/// Everything except `generationComplete` is opaque to the polling layer and
/// kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub generation_complete: bool,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl JobStatus {
    pub fn is_complete(&self) -> bool {
        self.generation_complete
    }

    /// Typed view of the generated recipe, if the payload carries one.
    pub fn recipe(&self) -> Option<GeneratedRecipe> {
        let value = serde_json::Value::Object(self.fields.clone());
        serde_json::from_value::<GeneratedRecipe>(value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(alias = "main_recipe")]
    pub main_recipe: RecipeSection,
    #[serde(default, alias = "sub_recipes")]
    pub sub_recipes: Vec<RecipeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSection {
    #[serde(default, alias = "recipe_name")]
    pub recipe_name: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, alias = "time_to_cook")]
    pub time_to_cook: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub amount: f64,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.amount, self.name)
        } else {
            write!(f, "{} {} of {}", self.amount, self.unit, self.name)
        }
    }
}

impl fmt::Display for RecipeSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ingredient in &self.ingredients {
            writeln!(f, "  - {}", ingredient)?;
        }
        for (index, step) in self.instructions.iter().enumerate() {
            writeln!(f, "  {}. {}", index + 1, step)?;
        }
        if let Some(minutes) = self.time_to_cook {
            writeln!(f, "  Time to cook: {} minutes", minutes)?;
        }
        Ok(())
    }
}

impl fmt::Display for GeneratedRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, "{}", title)?;
        }
        writeln!(f, "Main recipe")?;
        write!(f, "{}", self.main_recipe)?;
        for (index, sub) in self.sub_recipes.iter().enumerate() {
            match &sub.recipe_name {
                Some(name) => writeln!(f, "Sub recipe {}: {}", index + 1, name)?,
                None => writeln!(f, "Sub recipe {}", index + 1)?,
            }
            write!(f, "{}", sub)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn job_status_keeps_opaque_fields() {
        let status: JobStatus = serde_json::from_value(json!({
            "generationComplete": false,
            "title": "Pending",
            "progress": 40
        }))
        .unwrap();
        assert!(!status.is_complete());
        assert_eq!(status.fields.get("progress"), Some(&json!(40)));
        assert!(!status.fields.contains_key("generationComplete"));
        assert!(status.recipe().is_none());
    }

    #[test]
    fn job_status_without_completion_flag_is_malformed() {
        let result = serde_json::from_value::<JobStatus>(json!({ "title": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn completed_status_renders_recipe() {
        let status: JobStatus = serde_json::from_value(json!({
            "generationComplete": true,
            "title": "Shakshuka",
            "main_recipe": {
                "ingredients": [
                    { "name": "eggs", "unit": "", "amount": 4.0 },
                    { "name": "tomatoes", "unit": "cans", "amount": 2.0 }
                ],
                "instructions": ["Simmer the sauce", "Poach the eggs"],
                "time_to_cook": 25
            },
            "sub_recipes": []
        }))
        .unwrap();

        let recipe = status.recipe().expect("recipe payload");
        let text = recipe.to_string();
        assert!(text.starts_with("Shakshuka\n"));
        assert!(text.contains("  - 4 eggs\n"));
        assert!(text.contains("  - 2 cans of tomatoes\n"));
        assert!(text.contains("  2. Poach the eggs\n"));
        assert!(text.contains("Time to cook: 25 minutes"));
    }
}
