use serde::{Deserialize, Serialize};

/// A catalog product, exactly as the API returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub title: String,
  pub price: f64,
  pub description: String,
  pub category: String,
  pub image: String,
  pub rating: Rating,
}

/// Customer rating summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub rate: f64, // 0 to 5
  pub count: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"{
    "id": 1,
    "title": "Fjallraven - Foldsack No. 1 Backpack, Fits 15 Laptops",
    "price": 109.95,
    "description": "Your perfect pack for everyday use and walks in the forest.",
    "category": "men's clothing",
    "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
    "rating": { "rate": 3.9, "count": 120 }
  }"#;

  #[test]
  fn test_decode_api_product() {
    let product: Product = serde_json::from_str(SAMPLE).unwrap();

    assert_eq!(product.id, 1);
    assert_eq!(product.price, 109.95);
    assert_eq!(product.category, "men's clothing");
    assert_eq!(product.rating, Rating { rate: 3.9, count: 120 });
  }

  #[test]
  fn test_reencode_is_lossless() {
    let product: Product = serde_json::from_str(SAMPLE).unwrap();
    let bytes = serde_json::to_vec(&product).unwrap();

    assert_eq!(serde_json::from_slice::<Product>(&bytes).unwrap(), product);
  }

  #[test]
  fn test_missing_rating_is_rejected() {
    let json = r#"{"id":2,"title":"t","price":1.0,"description":"d","category":"c","image":"i"}"#;
    assert!(serde_json::from_str::<Product>(json).is_err());
  }
}
