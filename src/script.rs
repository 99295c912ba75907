use crate::scrape::Story;
use crate::topics::{QuoteRecord, ScrapedItem};
use crate::{logi, logok};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Which kind of video a run produces; decides prompts and output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDomain {
    Tech,
    Stoic,
    Trending,
    Research,
}

impl ContentDomain {
    pub fn slug(self) -> &'static str {
        match self {
            ContentDomain::Tech => "tech",
            ContentDomain::Stoic => "stoic",
            ContentDomain::Trending => "trending",
            ContentDomain::Research => "research",
        }
    }
}

/// `<root>/youtube-<domain>-<date>/…` for one day's run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
    slug: &'static str,
}

impl OutputLayout {
    pub fn new(root: &Path, domain: ContentDomain, date: NaiveDate) -> Self {
        let slug = domain.slug();
        Self {
            dir: root.join(format!("youtube-{}-{}", slug, date.format("%Y-%m-%d"))),
            slug,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn research(&self) -> PathBuf {
        self.dir.join(format!("research-{}.txt", self.slug))
    }

    pub fn script(&self) -> PathBuf {
        self.dir.join(format!("script-{}.txt", self.slug))
    }

    pub fn clean_script(&self) -> PathBuf {
        self.dir.join(format!("clean-script-{}.txt", self.slug))
    }

    pub fn voiceover(&self) -> PathBuf {
        self.dir.join(format!("voiceover-{}.wav", self.slug))
    }
}

pub async fn write_text(path: &Path, text: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    logok(format!("Script written to: {}", path.display()));
    Ok(path.to_path_buf())
}

pub fn tech_news_prompt(stories: &[Story]) -> String {
    let mut news_content = String::new();
    for (i, story) in stories.iter().enumerate() {
        let _ = write!(
            news_content,
            "\nNews {}:\nTitle: {}\nURL: {}\nPoints: {}\n",
            i + 1,
            story.title,
            story.link,
            story.points
        );
        if let Some(summary) = story
            .article_content
            .as_ref()
            .and_then(|a| a.description.as_deref().or(a.content.as_deref()))
        {
            let summary: String = summary.chars().take(300).collect();
            let _ = writeln!(news_content, "Summary: {summary}");
        }
    }
    logi(format!("Tech prompt built from {} stories", stories.len()));

    format!(
        "Create a 60-second YouTube Shorts script that summarizes these {count} tech news stories in an engaging way.

{news_content}

The script should:
1. Be exactly 60 seconds when read aloud (approximately 150 words)
2. Start with a hook in the first 3 seconds to grab attention
3. Summarize each news item in 10-12 seconds
4. Include why these news items matter to the viewer
5. End with a thought-provoking conclusion
6. Be engaging and suitable for YouTube Shorts
7. Only include the narrator's dialogue, no visual cues or music notes
8. Be written in a conversational, engaging tone
9. Use short sentences and simple language
10. Include a call to action at the end
11. Flow smoothly between different news items
12. Highlight the most interesting aspects of each story

Format the response as a clean script with only the narrator's lines.",
        count = stories.len()
    )
}

pub fn stoic_quote_prompt(quote: &QuoteRecord) -> String {
    format!(
        "Create a 30-second engaging script for a stoic philosophy YouTube Shorts video built around this quote:

\"{quote}\"
- {author}

The script should:
1. Be exactly 30 seconds when read aloud
2. Open by reading the quote
3. Explain what the quote means in plain, modern language
4. Give one concrete way to apply it today
5. Be engaging and suitable for YouTube Shorts
6. Only include the narrator's dialogue, no visual cues or music notes
7. Be written in a conversational, engaging tone

Format the response as a clean script with only the narrator's lines.",
        quote = quote.quote,
        author = quote.author
    )
}

pub fn trending_prompt(topics: &[ScrapedItem]) -> String {
    let mut content = String::new();
    for (i, topic) in topics.iter().enumerate() {
        let _ = write!(
            content,
            "\nTopic {}:\nTitle: {}\nSnippet: {}\nSource: {}\n",
            i + 1,
            topic.title,
            topic.snippet,
            if topic.source.is_empty() { "Unknown" } else { topic.source.as_str() }
        );
    }

    format!(
        "Pick the single topic below with the most potential to go viral and write a 45-second YouTube Shorts script about it.
{content}
Only include the narrator's dialogue, no visual cues or music notes. Write it conversationally, open with a hook and end with a call to action."
    )
}

pub fn short_form_script_prompt(research: &str) -> String {
    format!(
        "write a script for short form content most likely to be uploaded on youtube shorts/tiktok from the given content: {research}. Do not include any extra information, just write the script meaning only include parts that the narrator needs to read out. No extra context. Remove the additional information like visual aids and only write the narrator's dialogue."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::ArticleContent;

    #[test]
    fn layout_is_keyed_by_domain_and_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let layout = OutputLayout::new(Path::new("output"), ContentDomain::Tech, date);
        assert_eq!(layout.dir(), Path::new("output/youtube-tech-2026-10-19"));
        assert_eq!(layout.script(), Path::new("output/youtube-tech-2026-10-19/script-tech.txt"));
        assert_eq!(
            layout.voiceover(),
            Path::new("output/youtube-tech-2026-10-19/voiceover-tech.wav")
        );
    }

    #[test]
    fn tech_prompt_lists_every_story() {
        let stories: Vec<Story> = (1..=3)
            .map(|i| Story {
                title: format!("Story {i}"),
                link: format!("https://s/{i}"),
                points: format!("{}", i * 10),
                article_content: (i == 2).then(|| ArticleContent {
                    description: Some("desc two".to_string()),
                    ..ArticleContent::default()
                }),
                ..Story::default()
            })
            .collect();
        let prompt = tech_news_prompt(&stories);
        assert!(prompt.contains("these 3 tech news stories"));
        assert!(prompt.contains("News 3:\nTitle: Story 3\nURL: https://s/3\nPoints: 30"));
        assert!(prompt.contains("Summary: desc two"));
        assert!(prompt.contains("Only include the narrator's dialogue"));
    }

    #[test]
    fn stoic_prompt_quotes_author() {
        let q = QuoteRecord {
            quote: "Waste no more time.".to_string(),
            author: "Marcus Aurelius".to_string(),
            ..QuoteRecord::default()
        };
        let prompt = stoic_quote_prompt(&q);
        assert!(prompt.contains("\"Waste no more time.\"\n- Marcus Aurelius"));
    }

    #[tokio::test]
    async fn write_text_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/script.txt");
        write_text(&path, "hello").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
