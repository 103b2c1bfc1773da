use super::*;

const ACTIVE_CLASS: &str = "active";
const SCROLLED_CLASS: &str = "scrolled";
const NAV_LINK_SELECTOR: &str = ".nav-desktop a, .nav-mobile a";
const CARD_SELECTOR: &str = ".service-card, .project-card, .value-card";
const MENU_FOCUSABLE_SELECTOR: &str = "a, button";

/// Follow-up a key press asks of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Focus(NodeId),
    Click(NodeId),
}

/// Scroll position and the last element brought into view.
#[derive(Debug, Clone, Default)]
pub(crate) struct Viewport {
    pub(crate) scroll_y: i64,
    pub(crate) scrolled_into_view: Option<NodeId>,
}

impl Viewport {
    pub(crate) fn scroll_into_view(&mut self, node: NodeId) {
        self.scrolled_into_view = Some(node);
    }
}

/// Mobile menu and header state.
#[derive(Debug, Clone)]
pub(crate) struct Navigation {
    toggle: Option<NodeId>,
    menu: Option<NodeId>,
    header: Option<NodeId>,
    body: Option<NodeId>,
    scroll_threshold: i64,
}

impl Navigation {
    pub(crate) fn attach(dom: &Dom, config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            toggle: dom.query_selector(".nav-toggle")?,
            menu: dom.query_selector(".nav-mobile")?,
            header: dom.query_selector(".header")?,
            body: dom.query_selector("body")?,
            scroll_threshold: config.header_scroll_threshold,
        })
    }

    fn menu_parts(&self) -> Option<(NodeId, NodeId)> {
        Some((self.toggle?, self.menu?))
    }

    pub(crate) fn is_open(&self, dom: &Dom) -> bool {
        self.menu
            .is_some_and(|menu| dom.class_contains(menu, ACTIVE_CLASS).unwrap_or(false))
    }

    /// Marks navigation links pointing at `current_path`. Returns how many.
    pub(crate) fn mark_active_links(dom: &mut Dom, current_path: &str) -> Result<usize> {
        let mut marked = 0;
        for link in dom.query_selector_all(NAV_LINK_SELECTOR)? {
            let Some(href) = dom.attr(link, "href") else {
                continue;
            };
            let is_home = href == "index.html" && current_path.ends_with('/');
            if current_path.ends_with(href.as_str()) || is_home {
                dom.class_add(link, ACTIVE_CLASS)?;
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Handles a click that may concern the menu. Returns whether it did.
    pub(crate) fn handle_click(&mut self, page: &mut PageCtx<'_>, target: NodeId) -> Result<bool> {
        let Some((toggle, menu)) = self.menu_parts() else {
            return Ok(false);
        };

        if target == toggle || page.dom.is_descendant_of(target, toggle) {
            let was_open = self.is_open(page.dom);
            page.dom.class_toggle(toggle, ACTIVE_CLASS)?;
            page.dom.class_toggle(menu, ACTIVE_CLASS)?;
            if let Some(body) = self.body {
                page.dom
                    .style_set(body, "overflow", if was_open { "" } else { "hidden" })?;
            }
            page.dom
                .set_attr(toggle, "aria-expanded", if was_open { "false" } else { "true" })?;
            page.trace.line(TraceCategory::Nav, || {
                format!("menu {}", if was_open { "closed" } else { "opened" })
            });
            return Ok(true);
        }

        if page.dom.is_descendant_of(target, menu) && page.dom.closest(target, "a")?.is_some() {
            self.close(page, "link")?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Makes cards that wrap a link reachable with Tab. Returns how many.
    pub(crate) fn mark_keyboard_cards(dom: &mut Dom) -> Result<usize> {
        let mut marked = 0;
        for card in dom.query_selector_all(CARD_SELECTOR)? {
            if dom.query_selector_from(card, "a")?.is_some() {
                dom.set_attr(card, "tabindex", "0")?;
                marked += 1;
            }
        }
        Ok(marked)
    }

    pub(crate) fn handle_key(
        &mut self,
        page: &mut PageCtx<'_>,
        key: &str,
        target: NodeId,
    ) -> Result<Option<KeyAction>> {
        match key {
            "Escape" => {
                if self.is_open(page.dom) {
                    self.close(page, "escape")?;
                }
                Ok(None)
            }
            "Enter" => activate_card(page, target),
            "Tab" | "Shift+Tab" => self.wrap_menu_focus(page, target, key == "Shift+Tab"),
            _ => Ok(None),
        }
    }

    /// Keeps Tab cycling inside the mobile menu once focus reaches either end.
    fn wrap_menu_focus(
        &self,
        page: &mut PageCtx<'_>,
        target: NodeId,
        backwards: bool,
    ) -> Result<Option<KeyAction>> {
        let Some(menu) = self.menu else {
            return Ok(None);
        };
        if !page.dom.is_descendant_of(target, menu) {
            return Ok(None);
        }
        let focusable = page
            .dom
            .query_selector_all_from(menu, MENU_FOCUSABLE_SELECTOR)?;
        let (Some(first), Some(last)) = (focusable.first().copied(), focusable.last().copied())
        else {
            return Ok(None);
        };
        let next = match (backwards, target) {
            (true, current) if current == first => last,
            (false, current) if current == last => first,
            _ => return Ok(None),
        };
        let label = page.dom.node_label(next);
        page.trace
            .line(TraceCategory::Nav, || format!("focus wrapped to={label}"));
        Ok(Some(KeyAction::Focus(next)))
    }

    fn close(&mut self, page: &mut PageCtx<'_>, reason: &str) -> Result<()> {
        let Some((toggle, menu)) = self.menu_parts() else {
            return Ok(());
        };
        page.dom.class_remove(toggle, ACTIVE_CLASS)?;
        page.dom.class_remove(menu, ACTIVE_CLASS)?;
        if let Some(body) = self.body {
            page.dom.style_set(body, "overflow", "")?;
        }
        page.dom.set_attr(toggle, "aria-expanded", "false")?;
        page.trace
            .line(TraceCategory::Nav, || format!("menu closed via={reason}"));
        Ok(())
    }

    /// Syncs the header's `scrolled` class with the viewport position.
    pub(crate) fn on_scroll(&mut self, page: &mut PageCtx<'_>) -> Result<()> {
        let Some(header) = self.header else {
            return Ok(());
        };
        if page.viewport.scroll_y > self.scroll_threshold {
            page.dom.class_add(header, SCROLLED_CLASS)
        } else {
            page.dom.class_remove(header, SCROLLED_CLASS)
        }
    }
}

fn activate_card(page: &mut PageCtx<'_>, target: NodeId) -> Result<Option<KeyAction>> {
    let Some(card) = page.dom.closest(target, CARD_SELECTOR)? else {
        return Ok(None);
    };
    let Some(link) = page.dom.query_selector_from(card, "a")? else {
        return Ok(None);
    };
    let label = page.dom.node_label(card);
    page.trace
        .line(TraceCategory::Nav, || format!("card activated target={label}"));
    Ok(Some(KeyAction::Click(link)))
}
