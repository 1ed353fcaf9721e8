//! System framings and user-message templates for the model-backed stages.

pub const METADATA_SYSTEM: &str = "You are an assistant to a newsroom editor. \
Read the article and identify: suggested_categories (broad news sections such as \
\"Politics\" or \"Technology\"), suggested_tags (specific topics), entities (people, \
organizations and places, each as {\"name\", \"type\"}) and tone (one of neutral, \
critical, positive, investigative, opinion). Answer with a single JSON object.";

pub const AUDIT_SYSTEM: &str = "You are a senior news editor reviewing a draft. \
Score each of narrative_quality, preliminary_factuality, aggressiveness_level and \
neutrality_score from 0 to 10 as {\"score\", \"reason\"}; for neutrality 10 means fully \
neutral. List concrete edits under improvements_suggested. Answer with a single JSON object.";

pub const HUMANIZE_SYSTEM: &str = "You are a copy editor. Rewrite the text so it reads \
naturally: vary sentence length, use plain transitions and drop stock phrasing. Keep \
every fact and the journalistic register.";

pub const HEADLINE_SYSTEM: &str = "Write one headline for this news article: factual, \
specific, under 70 characters, no quotation marks. Answer with the headline only.";

pub const SUBHEADINGS_SYSTEM: &str = "Suggest three or four section subheadings for \
this news article. Answer with a JSON array of strings.";

pub const META_DESCRIPTION_SYSTEM: &str = "Write a search-result description of this \
news article between 120 and 160 characters. Answer with the description only.";

pub const SCHEMA_MARKUP_SYSTEM: &str = "Produce a schema.org NewsArticle JSON-LD object \
for this article with headline, description and articleBody. Answer with the JSON object only.";

pub fn metadata(text: &str) -> String {
    format!(
        "Extract metadata from this article.\n\nText:\n{text}\n\n\
         Keys: suggested_categories, suggested_tags, entities, tone"
    )
}

pub fn audit(text: &str) -> String {
    format!(
        "Audit this article.\n\nText:\n{text}\n\n\
         Keys: narrative_quality, preliminary_factuality, aggressiveness_level, \
         neutrality_score, improvements_suggested"
    )
}

pub fn humanize(text: &str) -> String {
    format!("Rewrite this text:\n\n{text}\n\nReturn only the rewritten text.")
}

pub fn headline(text: &str) -> String {
    format!("Article:\n{text}")
}

pub fn subheadings(text: &str) -> String {
    format!("Article:\n{text}")
}

pub fn meta_description(headline: &str, text: &str) -> String {
    format!("Headline: {headline}\n\nArticle:\n{text}")
}

pub fn schema_markup(headline: &str, description: &str, text: &str) -> String {
    format!("Headline: {headline}\nDescription: {description}\n\nArticle:\n{text}")
}
