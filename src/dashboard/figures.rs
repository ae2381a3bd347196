use crate::config::toml_config::{DropdownOption, WardstatsConfig};
use crate::dashboard::dataset::{Dataset, DashboardRow};
use crate::domain::model::Metric;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DEFAULT_GEOJSON_URL: &str = "/api/boundaries";
const MAP_MARGIN: u32 = 10;

/// 滑桿設定，index 對應 `Dataset::dates()`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SliderSpec {
    pub min: usize,
    pub max: usize,
    pub step: usize,
    pub value: usize,
    pub marks: BTreeMap<usize, String>,
}

/// 頁面初始化所需的控制項
#[derive(Debug, Clone, Serialize)]
pub struct Controls {
    pub options: Vec<DropdownOption>,
    pub default_metric: Metric,
    pub default_icb: String,
    pub slider: SliderSpec,
}

/// 產生 plotly figure JSON (`{data, layout}`)
pub struct FigureBuilder<'a> {
    config: &'a WardstatsConfig,
    dataset: &'a Dataset,
    geojson_url: String,
}

impl<'a> FigureBuilder<'a> {
    pub fn new(config: &'a WardstatsConfig, dataset: &'a Dataset) -> Self {
        Self {
            config,
            dataset,
            geojson_url: DEFAULT_GEOJSON_URL.to_string(),
        }
    }

    /// 邊界檔的來源 URL，瀏覽器端由 plotly 自行抓取
    pub fn with_geojson_url(mut self, url: impl Into<String>) -> Self {
        self.geojson_url = url.into();
        self
    }

    pub fn controls(&self) -> Controls {
        let labels = self.dataset.date_labels();
        let last = labels.len().saturating_sub(1);

        Controls {
            options: self.config.dropdown_options(),
            default_metric: self.config.dashboard.default_metric,
            default_icb: self.config.dashboard.default_icb.clone(),
            slider: SliderSpec {
                min: 0,
                max: last,
                step: 1,
                value: last,
                marks: labels.into_iter().enumerate().collect(),
            },
        }
    }

    /// 色階範圍 `(0, max)`；每十萬人容量至少顯示到設定的上限
    pub fn map_range(&self, metric: Metric, rows: &[&DashboardRow]) -> (f64, f64) {
        let max = rows
            .iter()
            .filter_map(|r| r.record.value(metric))
            .fold(0.0_f64, f64::max);

        match metric {
            Metric::CapacityPerPopulation => {
                (0.0, max.max(self.config.dashboard.capacity_per_population_map_max))
            }
            _ => (0.0, max),
        }
    }

    pub fn map_figure(&self, metric: Metric, date: Option<NaiveDate>) -> Result<Value> {
        let date = match date.or_else(|| self.dataset.latest_date()) {
            Some(date) => date,
            None => {
                return Err(EtlError::ValidationError {
                    message: "dataset has no records".to_string(),
                })
            }
        };

        // 只接受下拉選單中的指標；色條不加標題，名稱已顯示在下拉選單
        self.config.label(metric)?;
        let formatter = self.config.formatter(metric)?;
        let rows = self.dataset.rows_on(date);
        let (zmin, zmax) = self.map_range(metric, &rows);

        let locations: Vec<&str> = rows.iter().map(|r| r.record.icb_code.as_str()).collect();
        let z: Vec<Option<f64>> = rows.iter().map(|r| r.record.value(metric)).collect();
        let customdata: Vec<Value> = rows
            .iter()
            .map(|r| json!([r.icb_name, r.record.value(metric)]))
            .collect();
        let hovertemplate: Vec<String> = rows
            .iter()
            .map(|r| hover_template(formatter, r.record.is_suppressed(metric)))
            .collect();

        Ok(json!({
            "data": [{
                "type": "choroplethmapbox",
                "geojson": self.geojson_url,
                "featureidkey": self.dataset.boundaries().feature_id_key(),
                "locations": locations,
                "z": z,
                "zmin": zmin,
                "zmax": zmax,
                "customdata": customdata,
                "hovertemplate": hovertemplate,
                "colorscale": [[0, self.config.colours.white], [1, self.config.colours.dark_blue]],
                "marker": {"opacity": 0.8, "line": {"width": 0.5, "color": self.config.colours.dark_blue}},
                "colorbar": {"title": {"text": ""}, "tickformat": formatter},
            }],
            "layout": {
                "mapbox": {
                    "style": self.config.dashboard.map_style,
                    "zoom": self.config.dashboard.map_zoom,
                    "center": {
                        "lat": self.config.dashboard.map_centre.lat,
                        "lon": self.config.dashboard.map_centre.lon,
                    },
                },
                "margin": {"r": MAP_MARGIN, "t": MAP_MARGIN, "l": MAP_MARGIN, "b": MAP_MARGIN},
                "uirevision": "map",
            },
        }))
    }

    pub fn timeseries_figure(&self, icb_code: &str, metric: Metric) -> Result<Value> {
        let rows = self.dataset.rows_for_icb(icb_code);
        if rows.is_empty() {
            return Err(EtlError::lookup("ICB", icb_code));
        }

        let label = self.config.label(metric)?;
        let formatter = self.config.formatter(metric)?;
        let title = self.dataset.icb_name(icb_code).unwrap_or(icb_code);

        let x: Vec<String> = rows
            .iter()
            .map(|r| r.record.date.format("%Y-%m-%d").to_string())
            .collect();
        let y: Vec<Option<f64>> = rows.iter().map(|r| r.record.value(metric)).collect();
        let hovertemplate: Vec<String> = rows
            .iter()
            .map(|r| timeseries_hover_template(formatter, r.record.is_suppressed(metric)))
            .collect();

        let mut yaxis = json!({
            "title": {"text": yaxis_title(metric, label)},
            "tickformat": formatter,
            "rangemode": "tozero",
        });
        let mut shapes = Vec::new();
        let mut annotations = Vec::new();

        if metric == Metric::CapacityPerPopulation {
            let target = &self.config.dashboard.target;
            let max = y.iter().flatten().copied().fold(0.0_f64, f64::max);
            yaxis["range"] = json!([0.0, (max + 1.0).max(target.high)]);

            shapes.push(json!({
                "type": "rect",
                "xref": "paper",
                "x0": 0,
                "x1": 1,
                "yref": "y",
                "y0": target.low,
                "y1": target.high,
                "fillcolor": self.config.colours.light_blue,
                "opacity": 0.2,
                "line": {"width": 0},
                "layer": "below",
            }));
            annotations.push(json!({
                "text": target.annotation,
                "xref": "paper",
                "x": 1,
                "xanchor": "right",
                "yref": "y",
                "y": target.high,
                "yanchor": "bottom",
                "showarrow": false,
            }));
        }

        Ok(json!({
            "data": [{
                "type": "scatter",
                "mode": "lines",
                "x": x,
                "y": y,
                "line": {"color": self.config.colours.blue, "width": 2},
                "hovertemplate": hovertemplate,
            }],
            "layout": {
                "title": {"text": title},
                "xaxis": {"title": {"text": "Date"}, "tickformat": "%m/%y"},
                "yaxis": yaxis,
                "shapes": shapes,
                "annotations": annotations,
                "margin": {"r": MAP_MARGIN, "l": MAP_MARGIN},
            },
        }))
    }
}

/// 地圖 hover 文字：`名稱: 數值`，被隱藏的佔用率加上 `*`
pub fn hover_template(formatter: &str, suppressed: bool) -> String {
    let marker = if suppressed { "*" } else { "" };
    format!(
        "%{{customdata[0]}}: %{{customdata[1]:{}}}{}<extra></extra>",
        formatter, marker
    )
}

pub fn timeseries_hover_template(formatter: &str, suppressed: bool) -> String {
    let marker = if suppressed { "*" } else { "" };
    format!("%{{x|%m/%Y}}: %{{y:{}}}{}<extra></extra>", formatter, marker)
}

/// 折線圖 y 軸標題：取標籤中 `(` 之前的文字
pub fn yaxis_title(metric: Metric, label: &str) -> String {
    let title = label.split('(').next().unwrap_or(label).trim();
    match metric {
        Metric::CapacityPerPopulation => title.replacen("registered ", "registered <br>", 1),
        _ => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::dataset::fixtures::dataset;

    fn config() -> WardstatsConfig {
        WardstatsConfig::builtin().unwrap()
    }

    #[test]
    fn test_hover_template_marks_suppressed_values() {
        assert_eq!(
            hover_template(".0%", true),
            "%{customdata[0]}: %{customdata[1]:.0%}*<extra></extra>"
        );
        assert_eq!(
            hover_template(",d", false),
            "%{customdata[0]}: %{customdata[1]:,d}<extra></extra>"
        );
    }

    #[test]
    fn test_yaxis_title() {
        let config = config();
        assert_eq!(
            yaxis_title(
                Metric::CapacityPerPopulation,
                config.label(Metric::CapacityPerPopulation).unwrap()
            ),
            "Virtual ward capacity per 100,000 GP registered <br>population"
        );
        assert_eq!(
            yaxis_title(Metric::Occupancy, config.label(Metric::Occupancy).unwrap()),
            "Virtual ward occupancy"
        );
        assert_eq!(
            yaxis_title(Metric::Capacity, "Virtual ward capacity"),
            "Virtual ward capacity"
        );
    }

    #[test]
    fn test_map_range_uses_floor_for_capacity_per_population() {
        let config = config();
        let dataset = dataset();
        let builder = FigureBuilder::new(&config, &dataset);
        let rows = dataset.rows_on(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        assert_eq!(builder.map_range(Metric::CapacityPerPopulation, &rows), (0.0, 60.0));
        assert_eq!(builder.map_range(Metric::Capacity, &rows), (0.0, 305.0));
        assert_eq!(builder.map_range(Metric::Occupancy, &rows), (0.0, 1.0));
    }

    #[test]
    fn test_map_figure_defaults_to_latest_date() {
        let config = config();
        let dataset = dataset();
        let figure = FigureBuilder::new(&config, &dataset)
            .map_figure(Metric::Occupancy, None)
            .unwrap();

        let trace = &figure["data"][0];
        assert_eq!(trace["type"], "choroplethmapbox");
        assert_eq!(trace["geojson"], DEFAULT_GEOJSON_URL);
        assert_eq!(trace["featureidkey"], "properties.ICB22CD");
        assert_eq!(trace["locations"], json!(["QT6", "QMJ"]));
        assert_eq!(trace["customdata"][0], json!(["NHS Cornwall and the Isles of Scilly ICB", 1.0]));
        assert!(trace["hovertemplate"][0].as_str().unwrap().contains(":.0%}*"));
        assert!(!trace["hovertemplate"][1].as_str().unwrap().contains('*'));
        assert_eq!(trace["colorbar"]["tickformat"], ".0%");
        assert_eq!(trace["colorbar"]["title"]["text"], "");
        assert_eq!(trace["colorscale"], json!([[0, "#FFFFFF"], [1, "#003087"]]));

        let layout = &figure["layout"];
        assert_eq!(layout["mapbox"]["style"], "carto-positron");
        assert_eq!(layout["mapbox"]["zoom"], 5.5);
        assert_eq!(layout["margin"]["t"], 10);
    }

    #[test]
    fn test_timeseries_capacity_per_population_has_target_band() {
        let config = config();
        let dataset = dataset();
        let figure = FigureBuilder::new(&config, &dataset)
            .timeseries_figure("QT6", Metric::CapacityPerPopulation)
            .unwrap();

        assert_eq!(figure["layout"]["title"]["text"], "NHS Cornwall and the Isles of Scilly ICB");
        assert_eq!(figure["data"][0]["x"], json!(["2023-12-01", "2024-01-01", "2024-02-01"]));
        assert_eq!(figure["data"][0]["line"]["color"], "#005EB8");
        assert_eq!(figure["data"][0]["line"]["width"], 2);
        assert_eq!(figure["layout"]["xaxis"]["tickformat"], "%m/%y");
        assert_eq!(figure["layout"]["yaxis"]["range"], json!([0.0, 50.0]));

        let band = &figure["layout"]["shapes"][0];
        assert_eq!(band["y0"], 40.0);
        assert_eq!(band["y1"], 50.0);
        assert_eq!(band["fillcolor"], "#41B6E6");
        assert_eq!(band["opacity"], 0.2);
    }

    #[test]
    fn test_timeseries_marks_suppressed_occupancy() {
        let config = config();
        let dataset = dataset();
        let figure = FigureBuilder::new(&config, &dataset)
            .timeseries_figure("QT6", Metric::Occupancy)
            .unwrap();

        let templates: Vec<&str> = figure["data"][0]["hovertemplate"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t.as_str().unwrap())
            .collect();
        assert_eq!(templates.len(), 3);
        assert_eq!(templates[0], "%{x|%m/%Y}: %{y:.0%}<extra></extra>");
        assert_eq!(templates[2], "%{x|%m/%Y}: %{y:.0%}*<extra></extra>");

        // 只有 occupancy 會加上星號
        let figure = FigureBuilder::new(&config, &dataset)
            .timeseries_figure("QT6", Metric::Capacity)
            .unwrap();
        assert!(!figure["data"][0]["hovertemplate"][2].as_str().unwrap().contains('*'));
    }

    #[test]
    fn test_timeseries_other_metrics_have_no_band() {
        let config = config();
        let dataset = dataset();
        let figure = FigureBuilder::new(&config, &dataset)
            .timeseries_figure("QMJ", Metric::Capacity)
            .unwrap();

        assert_eq!(figure["layout"]["shapes"], json!([]));
        assert!(figure["layout"]["yaxis"].get("range").is_none());
    }

    #[test]
    fn test_timeseries_unknown_icb_is_lookup_error() {
        let config = config();
        let dataset = dataset();
        let err = FigureBuilder::new(&config, &dataset)
            .timeseries_figure("ZZZ", Metric::Capacity)
            .unwrap_err();
        assert!(matches!(err, EtlError::LookupError { .. }));
    }

    #[test]
    fn test_controls_select_latest_month() {
        let config = config();
        let dataset = dataset();
        let controls = FigureBuilder::new(&config, &dataset).controls();

        assert_eq!(controls.default_metric, Metric::CapacityPerPopulation);
        assert_eq!(controls.default_icb, "QT6");
        assert_eq!(controls.options.len(), 4);
        assert_eq!(controls.slider.max, 2);
        assert_eq!(controls.slider.value, 2);
        assert_eq!(controls.slider.marks[&0], "12/2023");
    }
}
