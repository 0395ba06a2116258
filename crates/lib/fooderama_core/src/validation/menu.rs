//! Restaurant, cuisine, category and dish request schemas.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::{
    FieldErrors, Validated, check, deserialize, limit_items, parse, parse_time, trimmed,
    trimmed_opt, validate_time,
};

pub const MAX_CUISINES_PER_REQUEST: usize = 5;
pub const MAX_DISHES_PER_CATEGORY: usize = 100;

/// Optional restaurant columns shared by create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantAttributes {
    pub rest_image: Option<String>,
    pub description: Option<String>,
    pub open: Option<bool>,
    pub rating: Option<f32>,
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRestaurant {
    pub rest_name: String,
    pub attributes: RestaurantAttributes,
}

/// Body of a restaurant create request.
#[derive(Debug, Clone, PartialEq)]
pub enum RestaurantCreate {
    /// One restaurant, optionally linked to existing cuisines.
    Single {
        restaurant: NewRestaurant,
        cuisine_ids: Option<Vec<i32>>,
    },
    /// Bulk insert without associations.
    Bulk(Vec<NewRestaurant>),
}

/// Partial restaurant update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestaurantPatch {
    pub rest_name: Option<String>,
    pub attributes: RestaurantAttributes,
    /// Desired cuisine set; replaces the current one.
    pub cuisine_ids: Option<Vec<i32>>,
    /// Replacement menu; every existing category is dropped first.
    pub categories: Option<Vec<NewCategory>>,
}

/// Filter for bulk restaurant deletion. At least one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestaurantFilter {
    pub rest_id: Option<i32>,
    pub rest_name: Option<String>,
    pub open: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCuisine {
    pub cuisine_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDish {
    pub dish_name: String,
    pub price: i32,
    pub sort_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub category_name: String,
    pub sort_id: i32,
    pub dishes: Vec<NewDish>,
}

/// Category create body: the owning restaurant plus the category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCreate {
    pub rest_id: i32,
    pub category: NewCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub category_name: Option<String>,
    pub sort_id: Option<i32>,
    /// Replacement dish list.
    pub dishes: Option<Vec<NewDish>>,
}

/// Upper-case the first letter of every space-separated word.
pub fn capitalize_words(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed and capitalised, so length rules see the stored form.
fn capitalized<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(capitalize_words(&trimmed(de)?))
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AttributesBody {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(url(message = "Invalid url"))]
    rest_image: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 4, max = 256, message = "Description must contain 4 to 256 character(s)"))]
    description: Option<String>,
    open: Option<bool>,
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    rating: Option<f32>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "validate_time", message = "Invalid time, expected HH:MM or HH:MM:SS"))]
    opening_time: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(custom(function = "validate_time", message = "Invalid time, expected HH:MM or HH:MM:SS"))]
    closing_time: Option<String>,
}

impl From<AttributesBody> for RestaurantAttributes {
    fn from(body: AttributesBody) -> Self {
        RestaurantAttributes {
            rest_image: body.rest_image,
            description: body.description,
            open: body.open,
            rating: body.rating,
            opening_time: body.opening_time.as_deref().and_then(parse_time),
            closing_time: body.closing_time.as_deref().and_then(parse_time),
        }
    }
}

/// `{ cuisineId }` with no other keys.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CuisineRef {
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    cuisine_id: i32,
}

fn cuisine_ids(refs: Option<Vec<CuisineRef>>) -> Option<Vec<i32>> {
    refs.map(|refs| refs.into_iter().map(|r| r.cuisine_id).collect())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RestaurantBody {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 32, message = "Restaurant name must contain 3 to 32 character(s)"))]
    rest_name: String,
    #[serde(flatten)]
    #[validate(nested)]
    attributes: AttributesBody,
    #[serde(rename = "Cuisines", default)]
    #[validate(nested)]
    cuisines: Option<Vec<CuisineRef>>,
}

/// Bulk items carry no associations.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct BulkRestaurantBody {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 32, message = "Restaurant name must contain 3 to 32 character(s)"))]
    rest_name: String,
    #[serde(flatten)]
    #[validate(nested)]
    attributes: AttributesBody,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RestaurantPatchBody {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 32, message = "Restaurant name must contain 3 to 32 character(s)"))]
    rest_name: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    attributes: AttributesBody,
    #[serde(rename = "Cuisines", default)]
    #[validate(nested)]
    cuisines: Option<Vec<CuisineRef>>,
    #[serde(rename = "Categories", default)]
    #[validate(nested)]
    categories: Option<Vec<CategoryBody>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "has_filter"))]
struct RestaurantFilterBody {
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    rest_id: Option<i32>,
    rest_name: Option<String>,
    open: Option<bool>,
}

fn has_filter(body: &RestaurantFilterBody) -> Result<(), ValidationError> {
    if body.rest_id.is_none() && body.rest_name.is_none() && body.open.is_none() {
        return Err(ValidationError::new("filter")
            .with_message("At least one filter (restId, restName or open) is required".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CuisineBody {
    #[validate(length(min = 4, max = 16, message = "Cuisine name must contain 4 to 16 character(s)"))]
    cuisine_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct DishBody {
    #[serde(deserialize_with = "capitalized")]
    #[validate(length(min = 3, max = 32, message = "Dish name must contain 3 to 32 character(s)"))]
    dish_name: String,
    #[validate(range(min = 1, max = 2048, message = "Price must be between 1 and 2048"))]
    price: i32,
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    sort_id: i32,
}

impl From<DishBody> for NewDish {
    fn from(body: DishBody) -> Self {
        NewDish {
            dish_name: body.dish_name,
            price: body.price,
            sort_id: body.sort_id,
        }
    }
}

fn new_dishes(dishes: Vec<DishBody>) -> Vec<NewDish> {
    dishes.into_iter().map(NewDish::from).collect()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CategoryBody {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, max = 50, message = "Category name must contain 3 to 50 character(s)"))]
    category_name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    sort_id: i32,
    #[serde(rename = "Dishes", default)]
    #[validate(nested)]
    dishes: Vec<DishBody>,
}

impl From<CategoryBody> for NewCategory {
    fn from(body: CategoryBody) -> Self {
        NewCategory {
            category_name: body.category_name,
            sort_id: body.sort_id,
            dishes: new_dishes(body.dishes),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CategoryCreateBody {
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    rest_id: i32,
    #[serde(flatten)]
    #[validate(nested)]
    category: CategoryBody,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CategoryPatchBody {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(min = 3, max = 50, message = "Category name must contain 3 to 50 character(s)"))]
    category_name: Option<String>,
    #[validate(range(min = 0, message = "Number must be greater than or equal to 0"))]
    sort_id: Option<i32>,
    #[serde(rename = "Dishes", default)]
    #[validate(nested)]
    dishes: Option<Vec<DishBody>>,
}

fn limit_dishes(errors: &mut FieldErrors, field: &str, dishes: &[DishBody]) {
    limit_items(errors, field, dishes.len(), MAX_DISHES_PER_CATEGORY);
}

fn limit_cuisines(errors: &mut FieldErrors, cuisines: Option<&Vec<CuisineRef>>) {
    if let Some(cuisines) = cuisines {
        limit_items(errors, "Cuisines", cuisines.len(), MAX_CUISINES_PER_REQUEST);
    }
}

fn reject_array(body: &Value) -> Validated<()> {
    if body.is_array() {
        return Err(FieldErrors::form("Request body can't be an array"));
    }
    Ok(())
}

/// Restaurant create body: a single object or an array for bulk insertion.
pub fn restaurant_create(body: &Value) -> Validated<RestaurantCreate> {
    if let Value::Array(items) = body {
        let mut errors = FieldErrors::default();
        let mut restaurants = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match parse::<BulkRestaurantBody>(item) {
                Ok(r) => restaurants.push(NewRestaurant {
                    rest_name: r.rest_name,
                    attributes: r.attributes.into(),
                }),
                Err(item_errors) => errors.merge(item_errors.prefixed(&i.to_string())),
            }
        }
        return if errors.is_empty() {
            Ok(RestaurantCreate::Bulk(restaurants))
        } else {
            Err(errors)
        };
    }

    let request: RestaurantBody = deserialize(body)?;
    let mut limits = FieldErrors::default();
    limit_cuisines(&mut limits, request.cuisines.as_ref());
    let request = check(request, limits)?;
    Ok(RestaurantCreate::Single {
        restaurant: NewRestaurant {
            rest_name: request.rest_name,
            attributes: request.attributes.into(),
        },
        cuisine_ids: cuisine_ids(request.cuisines),
    })
}

/// Restaurant update body. Every field is optional.
pub fn restaurant_patch(body: &Value) -> Validated<RestaurantPatch> {
    reject_array(body)?;
    let request: RestaurantPatchBody = deserialize(body)?;
    let mut limits = FieldErrors::default();
    limit_cuisines(&mut limits, request.cuisines.as_ref());
    for (i, category) in request.categories.iter().flatten().enumerate() {
        limit_dishes(&mut limits, &format!("Categories.{i}.Dishes"), &category.dishes);
    }
    let request = check(request, limits)?;
    Ok(RestaurantPatch {
        rest_name: request.rest_name,
        attributes: request.attributes.into(),
        cuisine_ids: cuisine_ids(request.cuisines),
        categories: request
            .categories
            .map(|categories| categories.into_iter().map(NewCategory::from).collect()),
    })
}

/// Bulk delete filter: `{ restId?, restName?, open? }`, at least one present.
pub fn restaurant_filter(body: &Value) -> Validated<RestaurantFilter> {
    let RestaurantFilterBody {
        rest_id,
        rest_name,
        open,
    } = parse(body)?;
    Ok(RestaurantFilter {
        rest_id,
        rest_name,
        open,
    })
}

/// Cuisine create/update body: `{ cuisineName }`.
pub fn cuisine(body: &Value) -> Validated<NewCuisine> {
    let CuisineBody { cuisine_name } = parse(body)?;
    Ok(NewCuisine { cuisine_name })
}

/// Category create body: `{ restId, categoryName, sortId?, Dishes? }`.
pub fn category_create(body: &Value) -> Validated<CategoryCreate> {
    let request: CategoryCreateBody = deserialize(body)?;
    let mut limits = FieldErrors::default();
    limit_dishes(&mut limits, "Dishes", &request.category.dishes);
    let request = check(request, limits)?;
    Ok(CategoryCreate {
        rest_id: request.rest_id,
        category: request.category.into(),
    })
}

/// Category update body: `{ categoryName?, sortId?, Dishes? }`.
pub fn category_patch(body: &Value) -> Validated<CategoryPatch> {
    reject_array(body)?;
    let request: CategoryPatchBody = deserialize(body)?;
    let mut limits = FieldErrors::default();
    if let Some(dishes) = &request.dishes {
        limit_dishes(&mut limits, "Dishes", dishes);
    }
    let request = check(request, limits)?;
    Ok(CategoryPatch {
        category_name: request.category_name,
        sort_id: request.sort_id,
        dishes: request.dishes.map(new_dishes),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_restaurant_with_cuisines() {
        let body = json!({
            "restName": "  Pasta Place ",
            "restImage": "https://img.example.com/p.png",
            "rating": 4.5,
            "openingTime": "09:00",
            "closingTime": "22:30:00",
            "Cuisines": [{ "cuisineId": 1 }, { "cuisineId": 2 }]
        });
        let RestaurantCreate::Single { restaurant, cuisine_ids } =
            restaurant_create(&body).unwrap()
        else {
            panic!("expected single");
        };
        assert_eq!(restaurant.rest_name, "Pasta Place");
        assert_eq!(restaurant.attributes.rating, Some(4.5));
        assert_eq!(
            restaurant.attributes.opening_time,
            NaiveTime::from_hms_opt(9, 0, 0)
        );
        assert_eq!(
            restaurant.attributes.closing_time,
            NaiveTime::from_hms_opt(22, 30, 0)
        );
        assert_eq!(cuisine_ids, Some(vec![1, 2]));
    }

    #[test]
    fn missing_name_is_required() {
        let errors = restaurant_create(&json!({ "open": true })).unwrap_err();
        assert_eq!(errors.for_field("restName"), ["Required"]);
    }

    #[test]
    fn too_many_cuisines_is_rejected() {
        let cuisines: Vec<_> = (1..=6).map(|id| json!({ "cuisineId": id })).collect();
        let errors =
            restaurant_create(&json!({ "restName": "Pasta", "Cuisines": cuisines })).unwrap_err();
        assert_eq!(
            errors.for_field("Cuisines"),
            ["Array must contain at most 5 element(s)"]
        );
    }

    #[test]
    fn cuisine_items_are_strict() {
        let body = json!({ "restName": "Pasta", "Cuisines": [{ "cuisineId": 1, "name": "x" }] });
        let errors = restaurant_create(&body).unwrap_err();
        assert_eq!(errors.form_errors.len(), 1);
        assert!(errors.form_errors[0].contains("unknown field `name`"));
    }

    #[test]
    fn negative_cuisine_id_is_keyed_by_index() {
        let body = json!({ "restName": "Pasta", "Cuisines": [{ "cuisineId": 1 }, { "cuisineId": -1 }] });
        let errors = restaurant_create(&body).unwrap_err();
        assert_eq!(
            errors.for_field("Cuisines.1.cuisineId"),
            ["Number must be greater than or equal to 0"]
        );
    }

    #[test]
    fn bulk_errors_are_keyed_by_index() {
        let body = json!([
            { "restName": "Good Name" },
            { "restName": "x", "rating": 9 }
        ]);
        let errors = restaurant_create(&body).unwrap_err();
        assert!(errors.for_field("0.restName").is_empty());
        assert_eq!(errors.for_field("1.restName").len(), 1);
        assert_eq!(errors.for_field("1.rating"), ["Rating must be between 0 and 5"]);
    }

    #[test]
    fn bulk_ignores_cuisines() {
        let body = json!([{ "restName": "One Place", "Cuisines": [{ "cuisineId": 1 }] }]);
        let RestaurantCreate::Bulk(items) = restaurant_create(&body).unwrap() else {
            panic!("expected bulk");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn invalid_image_and_time() {
        let body = json!({ "restName": "Pasta", "restImage": "not a url", "openingTime": "9am" });
        let errors = restaurant_create(&body).unwrap_err();
        assert_eq!(errors.for_field("restImage"), ["Invalid url"]);
        assert_eq!(
            errors.for_field("openingTime"),
            ["Invalid time, expected HH:MM or HH:MM:SS"]
        );
    }

    #[test]
    fn patch_with_categories_and_dishes() {
        let body = json!({
            "open": false,
            "Cuisines": [],
            "Categories": [{
                "categoryName": "Mains",
                "sortId": 1,
                "Dishes": [{ "dishName": "spicy  noodle soup", "price": 12, "sortId": 0 }]
            }]
        });
        let patch = restaurant_patch(&body).unwrap();
        assert_eq!(patch.rest_name, None);
        assert_eq!(patch.attributes.open, Some(false));
        assert_eq!(patch.cuisine_ids, Some(vec![]));
        let categories = patch.categories.unwrap();
        assert_eq!(categories[0].dishes[0].dish_name, "Spicy  Noodle Soup");
    }

    #[test]
    fn patch_rejects_arrays_and_reports_nested_paths() {
        let errors = restaurant_patch(&json!([])).unwrap_err();
        assert_eq!(errors.form_errors, vec!["Request body can't be an array"]);

        let body = json!({ "Categories": [{ "categoryName": "Mains", "Dishes": [{ "dishName": "Soup", "price": 0, "sortId": 0 }] }] });
        let errors = restaurant_patch(&body).unwrap_err();
        assert_eq!(
            errors.for_field("Categories.0.Dishes.0.price"),
            ["Price must be between 1 and 2048"]
        );
    }

    #[test]
    fn patch_limits_dishes_per_category() {
        let dishes: Vec<_> = (0..101)
            .map(|i| json!({ "dishName": "Dish", "price": 1, "sortId": i }))
            .collect();
        let body = json!({ "Categories": [{ "categoryName": "Mains", "Dishes": dishes }] });
        let errors = restaurant_patch(&body).unwrap_err();
        assert_eq!(
            errors.for_field("Categories.0.Dishes"),
            ["Array must contain at most 100 element(s)"]
        );
    }

    #[test]
    fn filter_requires_a_field() {
        let errors = restaurant_filter(&json!({})).unwrap_err();
        assert_eq!(
            errors.form_errors,
            ["At least one filter (restId, restName or open) is required"]
        );
        let filter = restaurant_filter(&json!({ "open": false })).unwrap();
        assert_eq!(filter.open, Some(false));
    }

    #[test]
    fn cuisine_name_bounds() {
        assert_eq!(cuisine(&json!({ "cuisineName": "Thai" })).unwrap().cuisine_name, "Thai");
        assert!(cuisine(&json!({ "cuisineName": "abc" })).is_err());
        assert!(cuisine(&json!({ "cuisineName": "x".repeat(17) })).is_err());
    }

    #[test]
    fn category_create_limits_dishes() {
        let dishes: Vec<_> = (0..101)
            .map(|i| json!({ "dishName": "Dish", "price": 1, "sortId": i }))
            .collect();
        let errors = category_create(&json!({ "restId": 1, "categoryName": "Mains", "Dishes": dishes }))
            .unwrap_err();
        assert_eq!(
            errors.for_field("Dishes"),
            ["Array must contain at most 100 element(s)"]
        );

        let created = category_create(&json!({ "restId": 3, "categoryName": " Desserts " })).unwrap();
        assert_eq!(created.rest_id, 3);
        assert_eq!(created.category.category_name, "Desserts");
        assert_eq!(created.category.sort_id, 0);
        assert!(created.category.dishes.is_empty());
    }

    #[test]
    fn category_create_reports_flattened_fields_at_top_level() {
        let errors = category_create(&json!({ "restId": 1, "categoryName": "ab" })).unwrap_err();
        assert_eq!(
            errors.for_field("categoryName"),
            ["Category name must contain 3 to 50 character(s)"]
        );
        let errors = category_create(&json!({ "categoryName": "Mains" })).unwrap_err();
        assert_eq!(errors.for_field("restId"), ["Required"]);
    }

    #[test]
    fn dish_name_is_measured_after_capitalising() {
        // 'ß' upper-cases to "SS", growing the stored name by one character.
        let body = json!({ "Dishes": [{ "dishName": "ß".repeat(32), "price": 5, "sortId": 0 }] });
        let errors = category_patch(&body).unwrap_err();
        assert_eq!(
            errors.for_field("Dishes.0.dishName"),
            ["Dish name must contain 3 to 32 character(s)"]
        );

        let body = json!({ "Dishes": [{ "dishName": "ß".repeat(31), "price": 5, "sortId": 0 }] });
        let patch = category_patch(&body).unwrap();
        let name = &patch.dishes.unwrap()[0].dish_name;
        assert!(name.starts_with("SS"));
        assert_eq!(name.chars().count(), 32);
    }

    #[test]
    fn category_patch_is_partial() {
        let patch = category_patch(&json!({ "sortId": 4 })).unwrap();
        assert_eq!(patch.sort_id, Some(4));
        assert_eq!(patch.category_name, None);
        assert_eq!(patch.dishes, None);
    }

    #[test]
    fn capitalizes_each_word() {
        assert_eq!(capitalize_words("fried rice"), "Fried Rice");
        assert_eq!(capitalize_words("éclair au chocolat"), "Éclair Au Chocolat");
    }
}
