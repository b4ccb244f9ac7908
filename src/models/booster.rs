//! Gradient-boosted tree regressor loaded from XGBoost's JSON model format.
//!
//! Only the parts of the format needed for inference and importances are read:
//!
//! ```text
//! learner.learner_model_param.base_score      "3.1E0" or "[3.1E0]"
//! learner.learner_model_param.num_class       optional, must be 0 or 1
//! learner.feature_names                        optional, checked against the schema
//! learner.objective.name                       optional, must be a `reg:` objective
//! learner.gradient_booster.model.trees[]       parallel node arrays
//! ```
//!
//! A node is a leaf when its left child is `-1`; the leaf value is stored in
//! `split_conditions`. Split comparisons are done in `f32`, matching how XGBoost
//! evaluates its own trees. The margin is `base_score + Σ leaves` (identity link).

use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::features::schema::{POINT_FEATURE_COUNT, PointFeature, PointFeatures};

#[derive(Debug, Deserialize)]
struct XgbModelFile {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    learner_model_param: XgbModelParam,
    gradient_booster: XgbGradientBooster,
    #[serde(default)]
    feature_names: Vec<String>,
    #[serde(default)]
    objective: Option<XgbObjective>,
}

#[derive(Debug, Deserialize)]
struct XgbModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XgbGradientBooster {
    #[serde(default)]
    name: Option<String>,
    model: Option<XgbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct XgbTreeModel {
    trees: Vec<XgbTree>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<BoolLike>,
    #[serde(default)]
    loss_changes: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

/// XGBoost has written `default_left` both as `0/1` and as booleans.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
}

impl BoolLike {
    fn as_bool(self) -> bool {
        match self {
            BoolLike::Bool(b) => b,
            BoolLike::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
        gain: f64,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn from_xgb(tree: &XgbTree, idx: usize) -> Result<Self, AppError> {
        let n = tree.left_children.len();
        let ctx = format!("tree {idx}");
        if n == 0 {
            return Err(AppError::model(format!("{ctx}: no nodes.")));
        }
        let lengths = [
            tree.right_children.len(),
            tree.split_indices.len(),
            tree.split_conditions.len(),
            tree.default_left.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(AppError::model(format!(
                "{ctx}: node arrays disagree in length ({n} left children vs {lengths:?})."
            )));
        }
        if !tree.loss_changes.is_empty() && tree.loss_changes.len() != n {
            return Err(AppError::model(format!("{ctx}: loss_changes length mismatch.")));
        }

        let mut nodes = Vec::with_capacity(n);
        for node in 0..n {
            let left = tree.left_children[node];
            if left == -1 {
                let value = tree.split_conditions[node];
                if !value.is_finite() {
                    return Err(AppError::model(format!("{ctx} node {node}: non-finite leaf.")));
                }
                nodes.push(TreeNode::Leaf { value });
                continue;
            }

            let right = tree.right_children[node];
            // Children are always allocated after their parent; this also rules out cycles.
            let child = |c: i64| -> Result<usize, AppError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > node && c < n)
                    .ok_or_else(|| {
                        AppError::model(format!("{ctx} node {node}: invalid child index {c}."))
                    })
            };
            let feature = usize::try_from(tree.split_indices[node])
                .ok()
                .filter(|&f| f < POINT_FEATURE_COUNT)
                .ok_or_else(|| {
                    AppError::model(format!(
                        "{ctx} node {node}: split feature {} outside the {POINT_FEATURE_COUNT}-feature schema.",
                        tree.split_indices[node]
                    ))
                })?;

            nodes.push(TreeNode::Split {
                feature,
                threshold: tree.split_conditions[node] as f32,
                left: child(left)?,
                right: child(right)?,
                default_left: tree.default_left[node].as_bool(),
                gain: tree.loss_changes.get(node).copied().unwrap_or(0.0),
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, x: &[f64; POINT_FEATURE_COUNT]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                    ..
                } => {
                    let v = x[*feature];
                    let go_left = if v.is_nan() {
                        *default_left
                    } else {
                        (v as f32) < *threshold
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// Tree-ensemble point regressor.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostedRegressor {
    base_score: f64,
    trees: Vec<RegressionTree>,
    objective: Option<String>,
}

impl GradientBoostedRegressor {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = super::read_artifact(path)?;
        Self::from_json_str(&text)
            .map_err(|e| AppError::model(format!("{}: {}", path.display(), e.message())))
    }

    pub fn from_json_str(text: &str) -> Result<Self, AppError> {
        let file: XgbModelFile = serde_json::from_str(text)
            .map_err(|e| AppError::model(format!("invalid XGBoost JSON: {e}")))?;
        let learner = file.learner;

        if let Some(name) = learner.gradient_booster.name.as_deref() {
            if name != "gbtree" {
                return Err(AppError::model(format!("unsupported booster '{name}'.")));
            }
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| AppError::model("booster has no tree model."))?;

        check_feature_names(&learner.feature_names)?;

        check_num_class(learner.learner_model_param.num_class.as_deref())?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let trees = model
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| RegressionTree::from_xgb(t, i))
            .collect::<Result<Vec<_>, _>>()?;

        let objective = learner.objective.map(|o| o.name);
        if let Some(name) = objective.as_deref() {
            if !name.starts_with("reg:") {
                return Err(AppError::model(format!(
                    "objective '{name}' is not a regression; the point regressor must predict a magnitude."
                )));
            }
            if !name.starts_with("reg:squarederror") {
                log::warn!("point regressor objective '{name}' is read as an identity-link regression");
            }
        }

        Ok(Self {
            base_score,
            trees,
            objective,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    pub fn predict(&self, features: &PointFeatures) -> f64 {
        let x = features.as_array();
        self.base_score + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
    }

    /// Gain importance per feature, normalised to sum to 1.
    ///
    /// Each feature's score is the mean loss reduction over its split nodes. A model
    /// without splits (or without recorded gains) yields all zeros.
    pub fn feature_importances(&self) -> [f64; POINT_FEATURE_COUNT] {
        let mut total = [0.0; POINT_FEATURE_COUNT];
        let mut count = [0usize; POINT_FEATURE_COUNT];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let TreeNode::Split { feature, gain, .. } = node {
                    total[*feature] += gain;
                    count[*feature] += 1;
                }
            }
        }

        let mut scores = [0.0; POINT_FEATURE_COUNT];
        for i in 0..POINT_FEATURE_COUNT {
            if count[i] > 0 {
                scores[i] = total[i] / count[i] as f64;
            }
        }
        let sum: f64 = scores.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            for s in scores.iter_mut() {
                *s /= sum;
            }
        } else {
            scores = [0.0; POINT_FEATURE_COUNT];
        }
        scores
    }
}

fn parse_base_score(raw: &str) -> Result<f64, AppError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::model(format!("invalid base_score '{raw}'.")))
}

/// Multi-class boosters interleave one tree per class; summing them is meaningless.
fn check_num_class(raw: Option<&str>) -> Result<(), AppError> {
    let Some(raw) = raw else {
        return Ok(());
    };
    let classes = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::model(format!("invalid num_class '{raw}'.")))?;
    if classes > 1.0 {
        return Err(AppError::model(format!(
            "num_class is {raw}; a classifier cannot serve as the point regressor."
        )));
    }
    Ok(())
}

fn check_feature_names(names: &[String]) -> Result<(), AppError> {
    if names.is_empty() {
        return Ok(());
    }
    let matches = names.len() == POINT_FEATURE_COUNT
        && names
            .iter()
            .zip(PointFeature::ALL)
            .all(|(name, feature)| name == feature.name());
    if matches {
        Ok(())
    } else {
        Err(AppError::model(format!(
            "feature names {names:?} do not match the point-feature schema."
        )))
    }
}
