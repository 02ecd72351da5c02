use crate::config::{ClassifierConfig, ConcaveThresholds};
use crate::types::*;
use anyhow::Result;
use regex::Regex;
use tracing::{debug, trace};

/// Splits quotation lines into wheels and accessories and derives the
/// concave badge for each wheel from its offset (ET).
///
/// Wheel detection is permissive: any single signal marks a wheel.
///
/// Every operation is pure and infallible: malformed text yields
/// "not a wheel", no offset, or tier 0.
pub struct LineItemClassifier {
    /// `[CODE] Title` prefix on the first line of a name
    code_pattern: Regex,
    /// Width x diameter, e.g. `10.5x23`, `9J x 21`
    width_by_diameter: Regex,
    /// Offset designator, e.g. `ET20`, `et -5`
    offset_designator: Regex,
    /// Offset designator with the numeric value captured
    offset_capture: Regex,
    /// Rim width in inches from a size hint, e.g. `10.5J`
    rim_width_pattern: Regex,
    /// Lowercased keywords that mark a name as a wheel
    wheel_keywords: Vec<String>,
    thresholds: ConcaveThresholds,
}

impl Default for LineItemClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default()).expect("built-in classifier patterns must compile")
    }
}

impl LineItemClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        Ok(Self {
            code_pattern: Regex::new(r"^\[(.*?)\]\s*(.*)")?,
            width_by_diameter: Regex::new(r"(?i)\d+(?:\.\d+)?[a-z]?\s*x\s*\d+")?,
            offset_designator: Regex::new(r"(?i)ET\s*-?\d+")?,
            offset_capture: Regex::new(r"(?i)ET\s*(-?\d+)")?,
            rim_width_pattern: Regex::new(r"(\d+(?:\.\d+)?)[Jj]")?,
            wheel_keywords: config
                .wheel_keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            thresholds: config.concave.clone(),
        })
    }

    /// Split the name into title, description and bracketed code.
    pub fn parse(&self, item: &LineItem) -> ParsedLineItem {
        let mut lines = item.name.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));
        let mut title = lines.next().unwrap_or("").to_string();

        let rest = lines.collect::<Vec<_>>().join("\n");
        let description = if rest.is_empty() {
            item.color.clone()
        } else {
            rest
        };

        let mut code = String::new();
        if let Some(caps) = self.code_pattern.captures(&title) {
            code = caps[1].to_string();
            title = caps[2].to_string();
        }

        ParsedLineItem {
            title,
            description,
            code,
        }
    }

    /// Any one signal is enough: a size hint, a wheel keyword, a
    /// width x diameter pair, or an ET designator in the name.
    pub fn is_wheel(&self, item: &LineItem) -> bool {
        if !item.size_hint.trim().is_empty() {
            return true;
        }

        let lowered = item.name.to_lowercase();
        if self.wheel_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return true;
        }

        self.width_by_diameter.is_match(&item.name) || self.offset_designator.is_match(&item.name)
    }

    /// Offset (ET) of a wheel. Sources are searched in priority order
    /// and the first source containing a designator decides the result.
    pub fn extract_offset(&self, item: &LineItem, parsed: &ParsedLineItem) -> Option<i32> {
        let sources = [
            item.name.as_str(),
            item.size_hint.as_str(),
            item.category.as_str(),
            parsed.title.as_str(),
            parsed.description.as_str(),
        ];

        sources
            .iter()
            .find_map(|text| self.offset_capture.captures(text))
            .and_then(|caps| caps[1].parse::<i32>().ok())
    }

    /// Concave tier for an offset: 0 = none, 1 = Performance .. 4 = Super Deep.
    pub fn tier_of(&self, offset: Option<i32>) -> u8 {
        let Some(offset) = offset else {
            return 0;
        };
        let t = &self.thresholds;

        if offset > t.performance_max {
            0
        } else if offset >= t.performance_min {
            1
        } else if offset >= t.medium_min {
            2
        } else if offset >= t.deep_min {
            3
        } else {
            4
        }
    }

    /// Rim width in inches from the size hint (`10.5J x 23` -> 10.5), 0 when absent.
    pub fn rim_width(&self, item: &LineItem) -> f64 {
        self.rim_width_pattern
            .captures(&item.size_hint)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Classify and reorder: wheels first, then accessories, each group
    /// in its original relative order.
    pub fn classify(&self, items: &[LineItem]) -> Vec<ClassifiedLineItem> {
        self.classify_with_roles(items)
            .into_iter()
            .map(|(classified, _)| classified)
            .collect()
    }

    /// Same as [`classify`](Self::classify), also reporting the axle role
    /// of each wheel when the quotation holds exactly two wheels.
    pub fn classify_with_roles(
        &self,
        items: &[LineItem],
    ) -> Vec<(ClassifiedLineItem, Option<AxleRole>)> {
        let mut wheels = Vec::new();
        let mut accessories = Vec::new();

        for item in items {
            let parsed = self.parse(item);
            if self.is_wheel(item) {
                wheels.push((item, parsed));
            } else {
                accessories.push((item, parsed));
            }
        }

        let mut tiers: Vec<u8> = wheels
            .iter()
            .map(|(item, parsed)| self.tier_of(self.extract_offset(item, parsed)))
            .collect();
        let mut roles: Vec<Option<AxleRole>> = vec![None; wheels.len()];

        if wheels.len() == 2 {
            let (front, rear) = self.axle_order(wheels[0].0, wheels[1].0);
            roles[front] = Some(AxleRole::Front);
            roles[rear] = Some(AxleRole::Rear);

            // A front wheel is never deeper than its rear counterpart
            if tiers[rear] > 0 && tiers[front] > tiers[rear] {
                trace!(
                    front_tier = tiers[front],
                    rear_tier = tiers[rear],
                    "front wheel deeper than rear, clamping to rear tier"
                );
                tiers[front] = tiers[rear];
            }
        }

        debug!(
            wheels = wheels.len(),
            accessories = accessories.len(),
            "classified quotation lines"
        );

        let classified_wheels = wheels
            .into_iter()
            .zip(tiers)
            .zip(roles)
            .map(|(((item, parsed), tier), role)| {
                let classified = ClassifiedLineItem {
                    item: item.clone(),
                    parsed,
                    is_wheel: true,
                    concave_profile: ConcaveProfile::from_tier(tier),
                };
                (classified, role)
            });

        let classified_accessories = accessories.into_iter().map(|(item, parsed)| {
            let classified = ClassifiedLineItem {
                item: item.clone(),
                parsed,
                is_wheel: false,
                concave_profile: None,
            };
            (classified, None)
        });

        classified_wheels.chain(classified_accessories).collect()
    }

    /// Indices of (front, rear) for a two-wheel set. Input order is the
    /// default; the narrower rim is the front when both widths are known.
    fn axle_order(&self, first: &LineItem, second: &LineItem) -> (usize, usize) {
        let first_width = self.rim_width(first);
        let second_width = self.rim_width(second);

        if first_width > 0.0 && second_width > 0.0 && second_width < first_width {
            trace!(first_width, second_width, "narrower second wheel, swapping axles");
            (1, 0)
        } else {
            (0, 1)
        }
    }
}
