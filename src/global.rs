/// Sites serving chapter pages tend to block clients that do not look like a browser
pub static BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

pub static DEFAULT_MANGA_TITLE: &str = "Unknown Manga";
