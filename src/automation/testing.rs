//! In-memory pages for unit tests

use crate::automation::{Browser, Page};
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// A page that serves a fixed sequence of markup frames
#[derive(Clone)]
pub struct ScriptedPage {
    frames: Arc<Vec<String>>,
    frame: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    advance_on_scroll: Arc<AtomicBool>,
    scrolled: Arc<Mutex<Vec<String>>>,
    mutations: Arc<watch::Sender<u64>>,
}

impl ScriptedPage {
    pub fn new(frames: Vec<&str>) -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            frames: Arc::new(frames.into_iter().map(String::from).collect()),
            frame: Arc::new(AtomicUsize::new(0)),
            reads: Arc::new(AtomicUsize::new(0)),
            advance_on_scroll: Arc::new(AtomicBool::new(false)),
            scrolled: Arc::new(Mutex::new(Vec::new())),
            mutations: Arc::new(sender),
        }
    }

    /// Moves to the next frame and reports a mutation
    pub fn advance(&self) {
        let next = (self.frame.load(Ordering::SeqCst) + 1).min(self.frames.len() - 1);
        self.frame.store(next, Ordering::SeqCst);
        self.mutations.send_modify(|count| *count += 1);
    }

    pub fn advance_on_scroll(&self) {
        self.advance_on_scroll.store(true, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn scrolled(&self) -> Vec<String> {
        self.scrolled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn navigate(&self, _url: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn content(&self) -> DriverResult<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.frames[self.frame.load(Ordering::SeqCst)].clone())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        Err(DriverError::Unsupported(format!("click {}", selector)))
    }

    async fn scroll_into_view(&self, selector: &str) -> DriverResult<()> {
        self.scrolled.lock().unwrap().push(selector.to_string());
        if self.advance_on_scroll.load(Ordering::SeqCst) {
            self.advance();
        }
        Ok(())
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// A lazily loading, re-sortable numbered list plus its detail pages
///
/// The list shows its newest `page_size` items first; scrolling the last
/// item into view loads `page_size` more, and clicking the order control
/// switches to oldest-first starting again from one page.
#[derive(Clone)]
pub struct AlbumSite {
    pub list_url: String,
    pub total: u32,
    pub page_size: u32,
    pub details: Arc<HashMap<String, String>>,
    pub opened: Arc<AtomicUsize>,
    scrolls: Arc<Mutex<Vec<String>>>,
}

impl AlbumSite {
    pub fn new(total: u32, page_size: u32) -> Self {
        Self {
            list_url: "https://mp.example.com/album".to_string(),
            total,
            page_size,
            details: Arc::new(HashMap::new()),
            opened: Arc::new(AtomicUsize::new(0)),
            scrolls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Selectors scrolled into view on any of this site's pages
    pub fn scrolled(&self) -> Vec<String> {
        self.scrolls.lock().unwrap().clone()
    }

    pub fn with_details(mut self, details: HashMap<String, String>) -> Self {
        self.details = Arc::new(details);
        self
    }

    pub fn detail_link(number: u32) -> String {
        format!("https://mp.example.com/s/issue-{}", number)
    }

    /// Renders a ready detail page holding one content block per
    /// `(title, url)` pair
    pub fn detail_markup(records: &[(&str, &str)]) -> String {
        let blocks: String = records
            .iter()
            .map(|(title, url)| {
                format!(
                    "<p>{}</p><section><section><p>blurb</p><p>{}</p></section></section>",
                    title, url
                )
            })
            .collect();
        format!(
            r#"<html><body><h1 id="activity-name">Issue</h1><em id="publish_time">2024年05月12日 10:30</em><div id="js_content">{}</div></body></html>"#,
            blocks
        )
    }
}

#[async_trait]
impl Browser for AlbumSite {
    async fn open_page(&self) -> DriverResult<Box<dyn Page>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let (sender, _) = watch::channel(0);
        Ok(Box::new(AlbumPage {
            site: self.clone(),
            view: Mutex::new(AlbumView::default()),
            mutations: sender,
        }))
    }
}

#[derive(Default)]
struct AlbumView {
    url: Option<String>,
    ascending: bool,
    loaded: u32,
}

pub struct AlbumPage {
    site: AlbumSite,
    view: Mutex<AlbumView>,
    mutations: watch::Sender<u64>,
}

impl AlbumPage {
    fn render_list(&self, view: &AlbumView) -> String {
        let numbers: Vec<u32> = if view.ascending {
            (1..=view.loaded).collect()
        } else {
            (0..view.loaded).map(|i| self.site.total - i).collect()
        };

        let items: String = numbers
            .iter()
            .map(|n| {
                format!(
                    r#"<div class="album__list-item" data-title="Issue {n}" data-link="{link}"><span class="weui-mask-ellipsis__text">{n}. Issue {n}</span></div>"#,
                    n = n,
                    link = AlbumSite::detail_link(*n)
                )
            })
            .collect();

        format!(
            r#"<html><body><span class="js_positive_order">Oldest first</span><div class="album__list">{}</div></body></html>"#,
            items
        )
    }
}

#[async_trait]
impl Page for AlbumPage {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut view = self.view.lock().unwrap();
        *view = AlbumView {
            url: Some(url.to_string()),
            ascending: false,
            loaded: self.site.page_size.min(self.site.total),
        };
        Ok(())
    }

    async fn content(&self) -> DriverResult<String> {
        let view = self.view.lock().unwrap();
        match view.url.as_deref() {
            Some(url) if url == self.site.list_url => Ok(self.render_list(&view)),
            Some(url) => Ok(self
                .site
                .details
                .get(url)
                .cloned()
                .unwrap_or_else(|| "<html><body></body></html>".to_string())),
            None => Ok("<html><body></body></html>".to_string()),
        }
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        if selector != ".js_positive_order" {
            return Err(DriverError::Unsupported(format!("click {}", selector)));
        }
        {
            let mut view = self.view.lock().unwrap();
            view.ascending = true;
            view.loaded = self.site.page_size.min(self.site.total);
        }
        self.mutations.send_modify(|count| *count += 1);
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> DriverResult<()> {
        self.site.scrolls.lock().unwrap().push(selector.to_string());
        let grew = {
            let mut view = self.view.lock().unwrap();
            let before = view.loaded;
            view.loaded = (view.loaded + self.site.page_size).min(self.site.total);
            view.loaded != before
        };
        if grew {
            self.mutations.send_modify(|count| *count += 1);
        }
        Ok(())
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}
