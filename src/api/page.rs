use super::views::PageView;
use crate::extract::ALLOWED_EXTENSIONS;
use minijinja::{Environment, context};

const INDEX_TEMPLATE: &str = "index.html";

/// Compiled page templates.
pub(crate) struct Pages {
    env: Environment<'static>,
    max_upload_mb: usize,
}

impl Pages {
    pub(crate) fn new(max_upload_bytes: usize) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../../templates/index.html"))?;
        Ok(Self {
            env,
            max_upload_mb: max_upload_bytes.div_ceil(1024 * 1024),
        })
    }

    pub(crate) fn render_index(&self, view: &PageView) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX_TEMPLATE)?.render(context! {
            document => &view.document,
            summary => &view.summary,
            history => &view.history,
            accept => ALLOWED_EXTENSIONS.join(","),
            allowed => ALLOWED_EXTENSIONS.join(", "),
            max_upload_mb => self.max_upload_mb,
        })
    }
}
