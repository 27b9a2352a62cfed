use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::document::{self, Element};
use crate::error::GpxError;
use crate::sanitize::{MAX_COMMENT_CHARS, ozi_str};

/// Written verbatim ahead of the body so saved files match what OZI
/// Explorer itself produces on Import/Export GPX.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Display projection of one `<wpt>`: name, a "lat, lon" string, comment.
/// Re-derived from the document at load and written through on commit,
/// never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct WptRow {
    pub name: String,
    pub coords: String,
    pub cmt: String,
}

/// What happened when an edited comment was written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Written,
    /// The sanitized text overruns the comment budget by `excess`
    /// characters; nothing was written and the edit should stay open.
    TooLong { excess: usize },
    /// No `<wpt>` carries the row's name: the row is stale. The edit is
    /// discarded and the document left untouched.
    UnknownName,
}

/// A GPX file held in memory: the parsed tree, the serialization captured
/// at load (the change-detection baseline), the source path, and the
/// trailing-whitespace convention observed during projection, used when
/// synthesizing new nodes.
pub struct GpxFile {
    root: Element,
    baseline: String,
    path: PathBuf,
    tail_hint: String,
}

impl GpxFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GpxError> {
        let path = path.as_ref().to_path_buf();
        let xml = fs::read_to_string(&path)?;
        Self::from_xml(&xml, path)
    }

    /// Parse, then immediately serialize the untouched tree and keep that
    /// string: comparing against it later is reliable because both sides
    /// come from the same serializer.
    pub fn from_xml(xml: &str, path: PathBuf) -> Result<Self, GpxError> {
        let root = document::parse(xml)?;
        let baseline = document::serialize(&root);
        Ok(Self {
            root,
            baseline,
            path,
            tail_hint: "\n".to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// True once the in-memory document differs from what was loaded.
    pub fn is_modified(&self) -> bool {
        document::serialize(&self.root) != self.baseline
    }

    /// One-time normalization pass over all waypoints, in document order:
    /// builds the table rows, migrates legacy `<desc>` text into a fresh
    /// `<cmt>` when the comment is empty, and removes `<desc>` whether or
    /// not its text was taken. The tail of each waypoint's first child is
    /// sampled along the way; the last one seen becomes the convention for
    /// nodes created later.
    pub fn project_rows(&mut self) -> Vec<WptRow> {
        let mut rows = Vec::new();
        let mut tail = self.tail_hint.clone();
        for wpt in self
            .root
            .children
            .iter_mut()
            .filter(|c| c.local_name() == "wpt")
        {
            if let Some(first) = wpt.children.first() {
                tail = first.tail.clone();
            }
            let name = wpt
                .find_child("name")
                .map(|e| e.text.clone())
                .unwrap_or_default();
            let mut cmt = wpt
                .find_child("cmt")
                .map(|e| e.text.clone())
                .unwrap_or_default();
            if let Some(idx) = wpt.position_of("desc") {
                let desc_text = wpt.children[idx].text.clone();
                if cmt.is_empty() && !desc_text.is_empty() {
                    cmt = desc_text.clone();
                    let mut node = Element::new("cmt");
                    node.text = desc_text;
                    node.tail = tail.clone();
                    wpt.insert_before_last(node);
                }
                // the insert above may have shifted the index
                if let Some(idx) = wpt.position_of("desc") {
                    wpt.children.remove(idx);
                }
            }
            let lat = wpt.attr("lat").unwrap_or_default();
            let lon = wpt.attr("lon").unwrap_or_default();
            rows.push(WptRow {
                name,
                coords: format!("{}, {}", lat, lon),
                cmt,
            });
        }
        self.tail_hint = tail;
        rows
    }

    /// Validate and write an edited comment into the first waypoint whose
    /// `<name>` matches `name` (name uniqueness is the file author's
    /// responsibility). The sanitized form is only the validation gate: the
    /// text stored in the document is the raw input, as the OZI import
    /// workflow expects. A missing `<time>` is created set to now, a
    /// missing `<cmt>` is created before the closing position.
    pub fn commit_comment(&mut self, name: &str, text: &str) -> CommitOutcome {
        let clean = ozi_str(text);
        let len = clean.chars().count();
        if len > MAX_COMMENT_CHARS {
            return CommitOutcome::TooLong {
                excess: len - MAX_COMMENT_CHARS,
            };
        }

        let tail = self.tail_hint.clone();
        let Some(wpt) = self
            .root
            .children
            .iter_mut()
            .filter(|c| c.local_name() == "wpt")
            .find(|w| w.find_child("name").map(|n| n.text.as_str()) == Some(name))
        else {
            return CommitOutcome::UnknownName;
        };

        if wpt.find_child("time").is_none() {
            let mut node = Element::new("time");
            node.text = now_utc_millis();
            node.tail = tail.clone();
            wpt.children.insert(0, node);
        }
        if wpt.find_child("cmt").is_none() {
            let mut node = Element::new("cmt");
            node.tail = tail;
            wpt.insert_before_last(node);
        }
        if let Some(cmt) = wpt.find_child_mut("cmt") {
            cmt.text = text.to_string();
        }
        CommitOutcome::Written
    }

    /// Write the document back to its path if anything changed since load;
    /// returns whether a write happened. On a real write the metadata is
    /// recomputed first and the file is overwritten in place: no temp file,
    /// no backup.
    pub fn save(&mut self) -> Result<bool, GpxError> {
        if !self.is_modified() {
            return Ok(false);
        }
        self.refresh_metadata();
        let body = document::serialize(&self.root);
        fs::write(&self.path, format!("{}\n{}", XML_DECLARATION, body))?;
        Ok(true)
    }

    /// Recompute `<metadata>` from every waypoint: bounding box over all
    /// coordinates in 6-decimal fixed format, and the latest of all
    /// waypoint timestamps plus a fresh "now" (something was edited).
    /// Points may have been added by an external editor, so the whole set
    /// is rescanned every time. Missing metadata children are created;
    /// bounds are left alone when there are no waypoints at all.
    fn refresh_metadata(&mut self) {
        let mut lats: Vec<f64> = Vec::new();
        let mut lons: Vec<f64> = Vec::new();
        let mut times = vec![now_utc_millis()];
        for wpt in self
            .root
            .children
            .iter()
            .filter(|c| c.local_name() == "wpt")
        {
            if let (Some(lat), Some(lon)) = (wpt.attr("lat"), wpt.attr("lon")) {
                if let (Ok(lat), Ok(lon)) = (lat.parse::<f64>(), lon.parse::<f64>()) {
                    lats.push(lat);
                    lons.push(lon);
                }
            }
            if let Some(time) = wpt.find_child("time") {
                times.push(time.text.clone());
            }
        }

        let tail = self.tail_hint.clone();
        let metadata = match self.root.position_of("metadata") {
            Some(idx) => &mut self.root.children[idx],
            None => {
                let mut node = Element::new("metadata");
                node.text = tail.clone();
                node.tail = tail.clone();
                self.root.children.insert(0, node);
                &mut self.root.children[0]
            }
        };

        if !lats.is_empty() {
            let (min_lat, max_lat) = min_max(&lats);
            let (min_lon, max_lon) = min_max(&lons);
            let bounds = ensure_child(metadata, "bounds", &tail);
            bounds.set_attr("minlat", format!("{:.6}", min_lat));
            bounds.set_attr("maxlat", format!("{:.6}", max_lat));
            bounds.set_attr("minlon", format!("{:.6}", min_lon));
            bounds.set_attr("maxlon", format!("{:.6}", max_lon));
        }

        // lexicographically greatest == chronologically latest for ISO-8601 UTC
        let max_time = times.into_iter().max().unwrap_or_default();
        let time_node = ensure_child(metadata, "time", &tail);
        time_node.text = max_time;
    }
}

fn ensure_child<'a>(parent: &'a mut Element, name: &str, tail: &str) -> &'a mut Element {
    let idx = match parent.position_of(name) {
        Some(idx) => idx,
        None => {
            let mut node = Element::new(name);
            node.tail = tail.to_string();
            parent.children.push(node);
            parent.children.len() - 1
        }
    };
    &mut parent.children[idx]
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), &v| (lo.min(v), hi.max(v)),
    )
}

/// Current time in the form OZI Explorer writes: UTC, millisecond
/// precision, `Z` suffix.
pub fn now_utc_millis() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx(body: &str) -> GpxFile {
        let xml = format!(
            "<gpx xmlns=\"http://www.topografix.com/GPX/1/1\" version=\"1.1\">\n{}</gpx>\n",
            body
        );
        GpxFile::from_xml(&xml, PathBuf::from("test.gpx")).unwrap()
    }

    const TWO_WPTS: &str = " <metadata>\n  <time>2023-06-01T08:40:16Z</time>\n  <bounds minlat=\"0.000000\" minlon=\"0.000000\" maxlat=\"0.000000\" maxlon=\"0.000000\"/>\n </metadata>\n <wpt lat=\"54.9534770\" lon=\"37.8202050\">\n  <time>2023-05-23T00:00:00.000Z</time>\n  <name>WPT1</name>\n  <cmt>ЛАПИНО CMT</cmt>\n  <sym>Airport</sym>\n </wpt>\n <wpt lat=\"54.9555470\" lon=\"37.7698220\">\n  <name>WPT2</name>\n  <desc>родник у дороги</desc>\n  <sym>Flag</sym>\n </wpt>\n";

    #[test]
    fn projection_builds_rows_in_document_order() {
        let mut file = gpx(TWO_WPTS);
        let rows = file.project_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "WPT1");
        assert_eq!(rows[0].coords, "54.9534770, 37.8202050");
        assert_eq!(rows[0].cmt, "ЛАПИНО CMT");
    }

    #[test]
    fn projection_migrates_desc_into_empty_cmt_and_drops_desc() {
        let mut file = gpx(TWO_WPTS);
        let rows = file.project_rows();
        assert_eq!(rows[1].cmt, "родник у дороги");
        let out = document::serialize(file.root());
        assert!(!out.contains("<desc>"));
        assert!(out.contains("<cmt>родник у дороги</cmt>"));
    }

    #[test]
    fn desc_is_dropped_even_when_cmt_already_set() {
        let mut file = gpx(
            " <wpt lat=\"1\" lon=\"2\">\n  <name>A</name>\n  <cmt>keep me</cmt>\n  <desc>ignored</desc>\n </wpt>\n",
        );
        let rows = file.project_rows();
        assert_eq!(rows[0].cmt, "keep me");
        let out = document::serialize(file.root());
        assert!(!out.contains("desc"));
        assert!(out.contains("<cmt>keep me</cmt>"));
    }

    #[test]
    fn commit_accepts_exactly_the_budget_and_rejects_one_over() {
        let mut file = gpx(TWO_WPTS);
        file.project_rows();
        let hundred = "x".repeat(100);
        assert_eq!(file.commit_comment("WPT1", &hundred), CommitOutcome::Written);
        let over = "x".repeat(101);
        assert_eq!(
            file.commit_comment("WPT1", &over),
            CommitOutcome::TooLong { excess: 1 }
        );
    }

    #[test]
    fn commit_stores_the_raw_text_not_the_sanitized_form() {
        let mut file = gpx(TWO_WPTS);
        file.project_rows();
        assert_eq!(
            file.commit_comment("WPT1", "Родник, очень холодный"),
            CommitOutcome::Written
        );
        let out = document::serialize(file.root());
        // the comma survives: sanitization gates the length, it does not rewrite
        assert!(out.contains("<cmt>Родник, очень холодный</cmt>"));
    }

    #[test]
    fn commit_creates_time_and_cmt_nodes_with_the_projected_tail() {
        let mut file = gpx(
            " <wpt lat=\"1\" lon=\"2\">\n  <name>BARE</name>\n  <sym>Flag</sym>\n </wpt>\n",
        );
        file.project_rows();
        assert_eq!(file.commit_comment("BARE", "hello"), CommitOutcome::Written);
        let wpt = file.root().find_child("wpt").unwrap();
        let names: Vec<&str> = wpt.children.iter().map(|c| c.local_name()).collect();
        assert_eq!(names, ["time", "name", "cmt", "sym"]);
        let time = wpt.find_child("time").unwrap();
        assert_eq!(time.tail, "\n  ");
        assert!(is_utc_millis(&time.text), "bad timestamp: {}", time.text);
        assert_eq!(wpt.find_child("cmt").unwrap().text, "hello");
    }

    #[test]
    fn commit_on_a_stale_row_touches_nothing() {
        let mut file = gpx(TWO_WPTS);
        file.project_rows();
        let before = document::serialize(file.root());
        assert_eq!(
            file.commit_comment("NO_SUCH", "text"),
            CommitOutcome::UnknownName
        );
        assert_eq!(document::serialize(file.root()), before);
    }

    #[test]
    fn duplicate_names_write_into_the_first_match() {
        let mut file = gpx(
            " <wpt lat=\"1\" lon=\"2\">\n  <name>DUP</name>\n  <cmt>first</cmt>\n </wpt>\n <wpt lat=\"3\" lon=\"4\">\n  <name>DUP</name>\n  <cmt>second</cmt>\n </wpt>\n",
        );
        file.project_rows();
        assert_eq!(file.commit_comment("DUP", "edited"), CommitOutcome::Written);
        let cmts: Vec<String> = file
            .root()
            .children
            .iter()
            .filter(|c| c.local_name() == "wpt")
            .map(|w| w.find_child("cmt").map(|c| c.text.clone()).unwrap_or_default())
            .collect();
        assert_eq!(cmts, ["edited", "second"]);
    }

    #[test]
    fn unmodified_document_is_not_modified() {
        let mut file = gpx(TWO_WPTS);
        assert!(!file.is_modified());
        // projection itself counts as a change here because a desc migrates
        file.project_rows();
        assert!(file.is_modified());
    }

    #[test]
    fn projection_without_desc_leaves_the_document_pristine() {
        let mut file = gpx(
            " <wpt lat=\"1\" lon=\"2\">\n  <name>A</name>\n  <cmt>c</cmt>\n </wpt>\n",
        );
        file.project_rows();
        assert!(!file.is_modified());
    }

    #[test]
    fn timestamp_format_is_utc_milliseconds() {
        assert!(is_utc_millis(&now_utc_millis()));
    }

    fn write_fixture(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("points.gpx");
        let xml = format!(
            "<?xml version=\"1.0\"?>\n<gpx xmlns=\"http://www.topografix.com/GPX/1/1\" version=\"1.1\">\n{}</gpx>\n",
            body
        );
        fs::write(&path, xml).unwrap();
        (dir, path)
    }

    #[test]
    fn save_writes_declaration_and_recomputed_metadata() {
        let (_dir, path) = write_fixture(TWO_WPTS);
        let mut file = GpxFile::open(&path).unwrap();
        file.project_rows();
        assert_eq!(file.commit_comment("WPT1", "edited"), CommitOutcome::Written);
        assert!(file.save().unwrap());

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.starts_with(XML_DECLARATION));
        assert_eq!(out.lines().next().unwrap(), XML_DECLARATION);
        assert!(out.contains("minlat=\"54.953477\""));
        assert!(out.contains("maxlat=\"54.955547\""));
        assert!(out.contains("minlon=\"37.769822\""));
        assert!(out.contains("maxlon=\"37.820205\""));
        assert!(!out.contains("<desc>"));
        assert!(out.contains("<cmt>edited</cmt>"));

        // metadata time moved past the stored waypoint timestamps
        let meta_time = out
            .split("<metadata>")
            .nth(1)
            .and_then(|s| s.split("<time>").nth(1))
            .and_then(|s| s.split("</time>").next())
            .unwrap();
        assert!(meta_time > "2023-06-01T08:40:16Z");
        assert!(is_utc_millis(meta_time));
    }

    #[test]
    fn save_is_a_no_op_on_an_untouched_file() {
        let (_dir, path) = write_fixture(
            " <wpt lat=\"1\" lon=\"2\">\n  <name>A</name>\n  <cmt>c</cmt>\n </wpt>\n",
        );
        let before = fs::read_to_string(&path).unwrap();
        let mut file = GpxFile::open(&path).unwrap();
        file.project_rows();
        assert!(!file.save().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn save_creates_missing_metadata_with_bounds_and_time() {
        let (_dir, path) = write_fixture(
            " <wpt lat=\"5.5\" lon=\"-3.25\">\n  <name>ONLY</name>\n </wpt>\n",
        );
        let mut file = GpxFile::open(&path).unwrap();
        file.project_rows();
        assert_eq!(file.commit_comment("ONLY", "note"), CommitOutcome::Written);
        assert!(file.save().unwrap());

        let out = fs::read_to_string(&path).unwrap();
        assert!(out.contains("<metadata>"));
        assert!(out.contains("minlat=\"5.500000\""));
        assert!(out.contains("maxlat=\"5.500000\""));
        assert!(out.contains("minlon=\"-3.250000\""));
        assert!(out.contains("maxlon=\"-3.250000\""));
    }

    fn is_utc_millis(s: &str) -> bool {
        // YYYY-MM-DDTHH:MM:SS.mmmZ
        s.len() == 24
            && s.ends_with('Z')
            && s.as_bytes()[10] == b'T'
            && s.as_bytes()[19] == b'.'
    }
}
